//! Text-search routing, local fallback search, and stale-response guarding.

use crate::{backend::GeocodeHit, records::SiteRecord, types::Generation};

/// Default maximum number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const STREET_KEYWORDS: [&str; 14] = [
    "via ", "viale ", "piazza ", "corso ", "vicolo ", "largo ", "strada ", "contrada ", "località ",
    "loc.", "p.zza", "v.le", "c.so", "str.",
];

/// Where a query should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRoute {
    /// Blank input; nothing to do.
    Empty,
    /// Address-like text for the geocoder.
    Geocode(String),
    /// Free text matched against site names and descriptions.
    SiteSearch(String),
}

/// Results of a routed search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHits {
    /// The query was blank.
    Empty,
    /// Geocoder results.
    Places(Vec<GeocodeHit>),
    /// Matching sites.
    Sites(Vec<SiteRecord>),
}

impl SearchHits {
    /// Number of hits.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Places(p) => p.len(),
            Self::Sites(s) => s.len(),
        }
    }

    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// True for text containing digits or a street keyword.
pub fn is_address_like(text: &str) -> bool {
    if text.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    let padded = format!("{} ", text.trim().to_lowercase());
    STREET_KEYWORDS.iter().any(|k| {
        padded.starts_with(k) || padded.contains(&format!(" {k}"))
    })
}

/// Classifies a query.
pub fn route_query(text: &str) -> SearchRoute {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        SearchRoute::Empty
    } else if is_address_like(trimmed) {
        SearchRoute::Geocode(trimmed.to_string())
    } else {
        SearchRoute::SiteSearch(trimmed.to_string())
    }
}

/// Client-side search: case-insensitive substring over name and
/// description, in input order, at most `limit` hits.
pub fn search_local<'a>(records: &'a [SiteRecord], text: &str, limit: usize) -> Vec<&'a SiteRecord> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| r.matches_text(&needle))
        .take(limit)
        .collect()
}

/// Proof that a request was issued; carries its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(Generation);

impl SearchTicket {
    /// Generation of the request.
    pub fn generation(self) -> Generation {
        self.0
    }
}

/// Orders concurrent searches so an older response never replaces a newer one.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    issued: Generation,
    accepted: Generation,
}

impl SearchSession {
    /// Session with no requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a new request.
    pub fn begin(&mut self) -> SearchTicket {
        self.issued += 1;
        SearchTicket(self.issued)
    }

    /// Accepts `result` only if its request is newer than the last accepted
    /// one; superseded results are returned as `None`.
    pub fn complete<T>(&mut self, ticket: SearchTicket, result: T) -> Option<T> {
        if ticket.0 <= self.accepted {
            tracing::debug!(ticket = ticket.0, accepted = self.accepted, "dropping stale search result");
            return None;
        }
        self.accepted = ticket.0;
        Some(result)
    }

    /// True when no newer request has been issued since `ticket`.
    pub fn is_latest(&self, ticket: SearchTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Generation of the last accepted result.
    pub fn accepted(&self) -> Generation {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn routes_addresses_to_geocoder() {
        assert_eq!(route_query("   "), SearchRoute::Empty);
        assert_eq!(route_query("Via Roma 12, Lecce"), SearchRoute::Geocode("Via Roma 12, Lecce".into()));
        assert_eq!(route_query("piazza Sant'Oronzo"), SearchRoute::Geocode("piazza Sant'Oronzo".into()));
        assert_eq!(route_query("Egnazia"), SearchRoute::SiteSearch("Egnazia".into()));
        assert_eq!(route_query("Viaggio"), SearchRoute::SiteSearch("Viaggio".into()));
    }

    #[test]
    fn local_search_is_case_insensitive_and_limited() {
        let records: Vec<SiteRecord> = (0..15)
            .map(|i| {
                SiteRecord::from_row(&json!({"id": i, "nome": format!("Necropoli {i}")})).expect("record")
            })
            .collect();
        assert_eq!(search_local(&records, "NECRO", DEFAULT_SEARCH_LIMIT).len(), 10);
        assert_eq!(search_local(&records, "necropoli 14", 10)[0].id, "14");
        assert!(search_local(&records, "", 10).is_empty());
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut session = SearchSession::new();
        let first = session.begin();
        let second = session.begin();
        assert_eq!(session.complete(second, "new"), Some("new"));
        assert_eq!(session.complete(first, "old"), None);
        assert!(session.is_latest(second));
        assert_eq!(session.accepted(), 2);
    }
}
