use std::sync::Arc;

use archeomap::{
    core::{
        filters::{FilterCategory, MapFilters},
        opacity::{LayerOpacity, LayerVisibility},
    },
    engine::{InMemoryMap, LayerMutator, MapRenderer, PoiOverlay},
    persist::MemoryStore,
    providers::{ProviderRegistry, StaticKeys},
    query::{RestQuery, overlap_conditions, tile_url_template},
    style::{
        ComposeInput, SourceSpec, StyleDocument, compose_style, ensure_renderable, fallback_style,
        expr::eval_uncertainty_case, validate,
    },
    types::DataLayer,
    view_state::ViewStateCodec,
};
use serde_json::{Value, json};

const TILES: &str = "https://api.test/functions/v1";

fn compose(filters: &MapFilters, opacity: LayerOpacity) -> StyleDocument {
    compose_style(&ComposeInput {
        tiles_base: TILES,
        filters,
        visibility: LayerVisibility::default(),
        opacity,
    })
}

fn paint<'a>(style: &'a StyleDocument, layer: &str, name: &str) -> &'a Value {
    style
        .layer(layer)
        .and_then(|l| l.paint.get(name))
        .expect("paint property")
}

fn tiles_of(style: &StyleDocument, source: &str) -> Vec<String> {
    match style.sources.get(source).expect("source") {
        SourceSpec::Vector { tiles, .. } => tiles.clone(),
        other => panic!("unexpected source {other:?}"),
    }
}

#[test]
fn shared_link_restores_basemap_overlay_and_opacity() {
    let registry = Arc::new(ProviderRegistry::default());
    let codec = ViewStateCodec::new(Arc::clone(&registry));
    let query = "basemap=osm-hot&overlays=osm-data-overlay&opacity.osm-data-overlay=0.40";

    let state = codec.decode(query, &MemoryStore::new());
    assert_eq!(state.layers.basemap, "osm-hot");
    assert!(state.layers.overlays.contains("osm-data-overlay"));
    assert_eq!(state.layers.opacities.get("osm-data-overlay"), Some(0.4));
    assert_eq!(codec.encode_query(&state), query);

    let mut map = InMemoryMap::new(compose(&state.filters, state.fixed.opacity));
    LayerMutator::new(registry).sync(&mut map, &state.layers);
    assert!(map.has_layer("lyr-osm-hot"));
    assert!(!map.has_layer("lyr-osm-standard"));
    assert_eq!(map.paint("lyr-osm-data-overlay", "raster-opacity"), Some(&json!(0.4)));
    assert_eq!(map.paint("lyr-osm-hot", "raster-opacity"), Some(&json!(1.0)));
}

#[test]
fn unknown_basemap_falls_back_without_writing_storage() {
    let registry = Arc::new(ProviderRegistry::default());
    let codec = ViewStateCodec::new(Arc::clone(&registry));
    let storage = MemoryStore::new();

    let state = codec.decode("basemap=does-not-exist", &storage);
    assert_eq!(state.layers.basemap, "osm-standard");
    assert!(storage.entries().is_empty());

    let mut map = InMemoryMap::new(compose(&state.filters, state.fixed.opacity));
    let mutator = LayerMutator::new(registry);
    mutator.set_basemap_or_default(&mut map, "does-not-exist", 1.0);
    assert!(map.has_layer("lyr-osm-standard"));
}

#[test]
fn stored_basemap_with_missing_key_is_replaced() {
    let registry = Arc::new(ProviderRegistry::builtin(&StaticKeys::none()));
    let codec = ViewStateCodec::new(Arc::clone(&registry));
    let mut storage = MemoryStore::new();
    archeomap::persist::KeyValueStore::set(&mut storage, &codec.keys().basemap, "stadia-terrain")
        .expect("seed storage");
    assert_eq!(codec.decode("", &storage).layers.basemap, "osm-standard");

    let keyed = Arc::new(ProviderRegistry::builtin(&StaticKeys::none().with("STADIA_API_KEY", "k")));
    let codec = ViewStateCodec::new(keyed);
    assert_eq!(codec.decode("", &storage).layers.basemap, "stadia-terrain");
}

#[test]
fn chronology_filter_reaches_tiles_and_rest_query() {
    let registry = Arc::new(ProviderRegistry::default());
    let codec = ViewStateCodec::new(registry);
    let state = codec.decode("cron=c1,c2", &MemoryStore::new());
    assert_eq!(
        state.filters,
        MapFilters::new().with(FilterCategory::Cronologie, ["c1", "c2"])
    );

    let style = compose(&state.filters, LayerOpacity::default());
    for layer in DataLayer::ALL {
        let tiles = tiles_of(&style, layer.name());
        assert_eq!(
            tiles,
            vec![format!("{TILES}/tiles/{{z}}/{{x}}/{{y}}.mvt?layer={}&cronologie=c1,c2", layer.name())]
        );
    }
    assert_eq!(
        tile_url_template(TILES, DataLayer::Sites, &state.filters),
        format!("{TILES}/tiles/{{z}}/{{x}}/{{y}}.mvt?layer=sites&cronologie=c1,c2")
    );

    assert_eq!(
        overlap_conditions(&state.filters),
        vec![("cronologie".to_string(), "ov.{c1,c2}".to_string())]
    );
    let pairs = RestQuery::new("siti", &state.filters).pairs();
    assert!(pairs.contains(&("select".to_string(), "*".to_string())));
    assert!(pairs.contains(&("cronologie".to_string(), "ov.{c1,c2}".to_string())));
}

#[test]
fn uncertain_site_at_sixty_percent() {
    let opacity = LayerOpacity {
        sites: 0.6,
        ..LayerOpacity::default()
    };
    let style = compose(&MapFilters::new(), opacity);
    let circle = paint(&style, "sites-circle", "circle-opacity");
    assert_eq!(eval_uncertainty_case(circle, Some("incerta")), Some(0.21));
    assert_eq!(eval_uncertainty_case(circle, Some("certa")), Some(0.6));
}

#[test]
fn opacity_scaling_per_layer_part() {
    let opacity = LayerOpacity {
        sites: 0.8,
        province: 0.5,
        comuni: 1.0,
    };
    let style = compose(&MapFilters::new(), opacity);

    let fill = paint(&style, "sites-fill", "fill-opacity");
    assert_eq!(eval_uncertainty_case(fill, Some("incerta")), Some(0.28));
    assert_eq!(eval_uncertainty_case(fill, None), Some(0.48));

    let circle = paint(&style, "sites-circle", "circle-opacity");
    assert_eq!(eval_uncertainty_case(circle, Some("incerta")), Some(0.28));
    assert_eq!(eval_uncertainty_case(circle, None), Some(0.8));

    assert_eq!(paint(&style, "sites-outline", "line-opacity"), &json!(0.8));
    assert_eq!(paint(&style, "province-fill", "fill-opacity"), &json!(0.15));
    assert_eq!(paint(&style, "province-line", "line-opacity"), &json!(0.5));
    assert_eq!(paint(&style, "comuni-fill", "fill-opacity"), &json!(0.3));
}

#[test]
fn highlight_prefers_hover_over_selected() {
    let style = compose(&MapFilters::new(), LayerOpacity::default());
    let width = paint(&style, "sites-highlight", "line-width");
    assert_eq!(width[0], "case");
    assert_eq!(width[1][1][1], "hover");
    assert_eq!(width[2], 2.5);
    assert_eq!(width[3][1][1], "selected");
    assert_eq!(width[4], 3.0);
    assert_eq!(width[5], 0);
}

#[test]
fn broken_styles_become_renderable_fallback() {
    for broken in [
        json!({}),
        json!({"version": 8}),
        json!({"version": 8, "sources": {}, "layers": []}),
        json!({"version": 7, "sources": {"a": {"type": "raster", "tiles": [], "tileSize": 256}}, "layers": [{"id": "a", "type": "raster", "source": "a"}]}),
        json!({"version": 8, "sources": {"a": {"type": "raster", "tiles": [], "tileSize": 256}}, "layers": [{"id": "x", "type": "raster", "source": "missing"}]}),
        json!("not a style"),
    ] {
        let doc = ensure_renderable(&broken);
        assert_eq!(doc, fallback_style(), "input {broken}");
        assert_eq!(validate(&doc), Ok(()));
    }

    let good = compose(&MapFilters::new(), LayerOpacity::default());
    let value = serde_json::to_value(&good).expect("serialize");
    assert_eq!(ensure_renderable(&value), good);
}

#[test]
fn poi_layers_follow_basemap_swaps() {
    let registry = Arc::new(ProviderRegistry::default());
    let mut map = InMemoryMap::new(compose(&MapFilters::new(), LayerOpacity::default()));
    let mutator = LayerMutator::new(registry);
    let mut poi = PoiOverlay::new();

    poi.set_data(&mut map, json!({"type": "FeatureCollection", "features": []}));
    mutator.set_basemap(&mut map, "opentopomap", 1.0);
    let ids = map.layer_ids();
    assert_eq!(&ids[ids.len() - 2..], ["poi-circles", "poi-labels"]);

    map.set_style(compose(&MapFilters::new(), LayerOpacity::default()))
        .expect("style reset");
    assert!(poi.on_style_data(&mut map));
    assert!(!poi.on_style_data(&mut map));
}
