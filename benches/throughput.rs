use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use archeomap::{
    core::{
        filters::{FilterCategory, MapFilters},
        opacity::{LayerOpacity, LayerVisibility},
        state::ViewState,
        store::ViewStore,
    },
    engine::{InMemoryMap, LayerMutator},
    op::ViewOp,
    persist::MemoryStore,
    providers::ProviderRegistry,
    records::parse_rows,
    style::{ComposeInput, compose_style},
    view_state::ViewStateCodec,
};
use serde_json::json;

fn filters(terms: usize) -> MapFilters {
    FilterCategory::ALL.iter().fold(MapFilters::new(), |f, &category| {
        f.with(category, (0..terms).map(|i| format!("{}{i}", category.url_key())))
    })
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_style");
    for terms in [0usize, 10, 100] {
        let filters = filters(terms);
        group.bench_with_input(BenchmarkId::from_parameter(terms), &filters, |b, filters| {
            b.iter(|| {
                compose_style(&ComposeInput {
                    tiles_base: "https://api.test/functions/v1",
                    filters,
                    visibility: LayerVisibility::default(),
                    opacity: LayerOpacity::default(),
                })
            });
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let codec = ViewStateCodec::new(Arc::new(ProviderRegistry::default()));
    let storage = MemoryStore::new();
    let query = "basemap=osm-hot&overlays=hillshade,osm-data-overlay&opacity.hillshade=0.40\
                 &cx=17.10000&cy=40.60000&xz=9.50&cron=c1,c2,c3&amb=a1&3d=1&focus=site-7";
    c.bench_function("view_state_decode", |b| {
        b.iter(|| codec.decode(query, &storage));
    });
}

fn bench_store_apply(c: &mut Criterion) {
    let registry = Arc::new(ProviderRegistry::default());
    c.bench_function("store_apply_10k", |b| {
        b.iter(|| {
            let mut store = ViewStore::new(Arc::clone(&registry), ViewState::default_for(&registry));
            for i in 0..10_000u32 {
                let _ = store.apply(ViewOp::ToggleFilter {
                    category: FilterCategory::Cronologie,
                    term: format!("c{}", i % 64),
                });
            }
        });
    });
}

fn bench_basemap_swaps(c: &mut Criterion) {
    let mutator = LayerMutator::new(Arc::new(ProviderRegistry::default()));
    let filters = MapFilters::new();
    let style = compose_style(&ComposeInput {
        tiles_base: "https://api.test/functions/v1",
        filters: &filters,
        visibility: LayerVisibility::default(),
        opacity: LayerOpacity::default(),
    });
    c.bench_function("basemap_swap_1k", |b| {
        b.iter(|| {
            let mut map = InMemoryMap::new(style.clone());
            for i in 0..1_000 {
                let id = if i % 2 == 0 { "osm-hot" } else { "opentopomap" };
                mutator.set_basemap(&mut map, id, 1.0);
            }
        });
    });
}

fn bench_parse_rows(c: &mut Criterion) {
    let rows: Vec<_> = (0..5_000)
        .map(|i| {
            json!({
                "id": i,
                "nome": format!("Sito {i}"),
                "ambito": "Romano",
                "geometry": format!("{{\"type\":\"Point\",\"coordinates\":[{},{}]}}", 16.0 + f64::from(i) * 1e-4, 40.5),
            })
        })
        .collect();
    c.bench_function("parse_rows_5k", |b| {
        b.iter(|| parse_rows(&rows));
    });
}

criterion_group!(
    benches,
    bench_compose,
    bench_decode,
    bench_store_apply,
    bench_basemap_swaps,
    bench_parse_rows
);
criterion_main!(benches);
