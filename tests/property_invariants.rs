use std::sync::Arc;

use proptest::prelude::*;

use archeomap::{
    core::{
        filters::{FilterCategory, MapFilters},
        opacity::{LayerOpacity, LayerVisibility, ProviderOpacities},
        state::{Camera, FixedLayers, LayerState, ViewState},
    },
    engine::{
        InMemoryMap, LayerMutator, MapRenderer, PoiOverlay,
        mutator::provider_of_layer,
        poi::{POI_CIRCLES, POI_LABELS, POI_SOURCE},
    },
    persist::{MemoryHistory, MemoryStore},
    providers::ProviderRegistry,
    style::{ComposeInput, compose_style},
    types::{DataLayer, ProviderKind},
    view_state::ViewStateCodec,
};
use serde_json::json;

const BASEMAPS: [&str; 5] = ["osm-standard", "osm-hot", "opentopomap", "carto-positron", "esri-world-imagery"];
const OVERLAYS: [&str; 3] = ["osm-data-overlay", "openrailwaymap", "hillshade"];
const CANDIDATES: [&str; 10] = [
    "osm-standard",
    "osm-hot",
    "opentopomap",
    "stadia-terrain",
    "osm-data-overlay",
    "openrailwaymap",
    "hillshade",
    "thunderforest-transport",
    "unknown-id",
    "",
];

fn registry() -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::default())
}

fn base_map() -> InMemoryMap {
    let filters = MapFilters::new();
    InMemoryMap::new(compose_style(&ComposeInput {
        tiles_base: "https://api.test/functions/v1",
        filters: &filters,
        visibility: LayerVisibility::default(),
        opacity: LayerOpacity::default(),
    }))
}

fn count_layer(map: &InMemoryMap, id: &str) -> usize {
    map.layer_ids().iter().filter(|l| l.as_str() == id).count()
}

fn materialized_basemaps(map: &InMemoryMap, registry: &ProviderRegistry) -> Vec<String> {
    map.layer_ids()
        .iter()
        .filter_map(|id| provider_of_layer(id).map(str::to_string))
        .filter(|id| registry.lookup(id).is_some_and(|p| p.kind == ProviderKind::Basemap))
        .collect()
}

#[derive(Debug, Clone)]
enum MapAction {
    SetBasemap(usize),
    ToggleOverlay(usize, Option<bool>),
    SetData(u8),
    ResetStyle,
    StyleData,
}

fn map_action() -> impl Strategy<Value = MapAction> {
    prop_oneof![
        (0usize..CANDIDATES.len()).prop_map(MapAction::SetBasemap),
        (0usize..CANDIDATES.len(), proptest::option::of(any::<bool>()))
            .prop_map(|(i, e)| MapAction::ToggleOverlay(i, e)),
        any::<u8>().prop_map(MapAction::SetData),
        Just(MapAction::ResetStyle),
        Just(MapAction::StyleData),
    ]
}

fn layer_state() -> impl Strategy<Value = LayerState> {
    (
        0usize..BASEMAPS.len(),
        proptest::collection::btree_set(0usize..OVERLAYS.len(), 0..=OVERLAYS.len()),
        proptest::collection::btree_map(0usize..BASEMAPS.len() + OVERLAYS.len(), 0u8..=100, 0..4),
    )
        .prop_map(|(basemap, overlays, opacities)| {
            let all: Vec<&str> = BASEMAPS.iter().chain(OVERLAYS.iter()).copied().collect();
            LayerState {
                basemap: BASEMAPS[basemap].to_string(),
                overlays: overlays.into_iter().map(|i| OVERLAYS[i].to_string()).collect(),
                opacities: opacities
                    .into_iter()
                    .map(|(i, pct)| (all[i].to_string(), f64::from(pct) / 100.0))
                    .collect::<ProviderOpacities>(),
            }
        })
}

fn term() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9]{0,4}".prop_map(|s| s),
        Just(String::new()),
        Just("  ".to_string()),
        Just("a,b".to_string()),
    ]
}

proptest! {
    #[test]
    fn poi_ensure_is_idempotent(actions in proptest::collection::vec(map_action(), 1..40)) {
        let registry = registry();
        let mutator = LayerMutator::new(Arc::clone(&registry));
        let mut map = base_map();
        let mut poi = PoiOverlay::new();

        for action in actions {
            match action {
                MapAction::SetBasemap(i) => {
                    mutator.set_basemap(&mut map, CANDIDATES[i], 1.0);
                }
                MapAction::ToggleOverlay(i, enable) => {
                    mutator.toggle_overlay(&mut map, CANDIDATES[i], enable, 0.7);
                }
                MapAction::SetData(n) => {
                    poi.set_data(&mut map, json!({"type": "FeatureCollection", "features": [], "n": n}));
                }
                MapAction::ResetStyle => {
                    let style = base_map().style().clone();
                    map.set_style(style).expect("reset style");
                }
                MapAction::StyleData => {}
            }
            poi.on_style_data(&mut map);

            prop_assert!(map.has_source(POI_SOURCE));
            prop_assert_eq!(count_layer(&map, POI_CIRCLES), 1);
            prop_assert_eq!(count_layer(&map, POI_LABELS), 1);

            let events = map.style_events();
            prop_assert!(!poi.on_style_data(&mut map));
            prop_assert_eq!(map.style_events(), events);
        }
    }

    #[test]
    fn at_most_one_basemap_is_materialized(actions in proptest::collection::vec(map_action(), 1..40)) {
        let registry = registry();
        let mutator = LayerMutator::new(Arc::clone(&registry));
        let mut map = base_map();

        for action in actions {
            match action {
                MapAction::SetBasemap(i) => {
                    let before = materialized_basemaps(&map, &registry);
                    let outcome = mutator.set_basemap(&mut map, CANDIDATES[i], 1.0);
                    let after = materialized_basemaps(&map, &registry);
                    if registry.is_valid_basemap(CANDIDATES[i]) {
                        prop_assert_eq!(after, vec![CANDIDATES[i].to_string()]);
                    } else {
                        prop_assert_eq!(outcome, archeomap::engine::BasemapOutcome::Rejected);
                        prop_assert_eq!(after, before);
                    }
                }
                MapAction::ToggleOverlay(i, enable) => {
                    mutator.toggle_overlay(&mut map, CANDIDATES[i], enable, 0.5);
                }
                MapAction::ResetStyle => {
                    let style = base_map().style().clone();
                    map.set_style(style).expect("reset style");
                }
                MapAction::SetData(_) | MapAction::StyleData => {}
            }
            prop_assert!(materialized_basemaps(&map, &registry).len() <= 1);
        }
    }

    #[test]
    fn layer_state_round_trips_through_url_and_storage(layers in layer_state()) {
        let registry = registry();
        let codec = ViewStateCodec::new(Arc::clone(&registry));
        let state = ViewState::from_layers(layers.clone());

        let query = codec.encode_query(&state);
        let from_url = codec.decode(&query, &MemoryStore::new());
        prop_assert_eq!(&from_url.layers, &layers);

        let mut storage = MemoryStore::new();
        let mut history = MemoryHistory::new();
        codec.persist(&state, &mut storage, &mut history).expect("persist");
        let from_storage = codec.decode("", &storage);
        prop_assert_eq!(&from_storage.layers, &layers);
        prop_assert_eq!(history.current(), Some(query));
    }

    #[test]
    fn full_view_round_trips_through_url(
        layers in layer_state(),
        cron in proptest::collection::btree_set("[a-z][0-9]{1,2}", 0..3),
        lng in -180.0f64..180.0,
        lat in -85.0f64..85.0,
        zoom in 0.0f64..22.0,
        sites_visible in any::<bool>(),
        sites_pct in 0u8..=100,
        terrain in any::<bool>(),
    ) {
        let registry = registry();
        let codec = ViewStateCodec::new(Arc::clone(&registry));
        let mut fixed = FixedLayers::default();
        fixed.visibility.set(DataLayer::Sites, sites_visible);
        fixed.opacity.set(DataLayer::Sites, f64::from(sites_pct) / 100.0);
        let state = ViewState {
            layers,
            filters: MapFilters::new().with(FilterCategory::Cronologie, cron),
            camera: Camera::new(lng, lat, zoom),
            fixed,
            terrain_3d: terrain,
            focus: Some("site-42".to_string()),
        };
        let decoded = codec.decode(&codec.encode_query(&state), &MemoryStore::new());
        prop_assert_eq!(decoded, state);
    }

    #[test]
    fn filters_never_keep_empty_sets(
        ops in proptest::collection::vec((0usize..4, term(), any::<bool>()), 1..30)
    ) {
        let mut filters = MapFilters::new();
        for (category, term, replace) in ops {
            let category = FilterCategory::ALL[category];
            if replace {
                filters.set(category, [term]);
            } else {
                filters.toggle(category, &term);
            }
            for c in FilterCategory::ALL {
                if let Some(set) = filters.get(c) {
                    prop_assert!(!set.is_empty());
                    prop_assert!(set.iter().all(|t| !t.trim().is_empty() && !t.contains(',')));
                }
            }
        }
        let round_trip = MapFilters::from_json(&serde_json::to_value(&filters).expect("json"));
        prop_assert_eq!(round_trip, filters);
    }
}

#[test]
fn toggling_a_term_twice_removes_the_category() {
    let mut filters = MapFilters::new();
    assert!(filters.toggle(FilterCategory::Ambiti, "a1"));
    assert!(!filters.toggle(FilterCategory::Ambiti, "a1"));
    assert_eq!(filters.get(FilterCategory::Ambiti), None);
    assert!(filters.is_empty());
}
