//! Planning and registry performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use tempfile::TempDir;
use uigen::*;

/// Three-level tree: `groups` groups of `per_group` containers with two leaves each
fn wide_tree(groups: usize, per_group: usize) -> String {
    let mut group_entries = Vec::new();
    for g in 0..groups {
        let mut units = Vec::new();
        for u in 0..per_group {
            units.push(format!(
                r#""Panel{u}": {{"kind": "layout", "description": "Panel {u}", "children": {{
                    "SearchForm": {{"kind": "form"}},
                    "ResultsTable": {{"kind": "data"}}
                }}}}"#
            ));
        }
        group_entries.push(format!(
            r#""Section{g}": {{"description": "Section {g}", "children": {{{}}}}}"#,
            units.join(",")
        ));
    }
    format!(r#"{{"App": {{"children": {{{}}}}}}}"#, group_entries.join(","))
}

fn bench_small_plan(c: &mut Criterion) {
    let source = wide_tree(2, 3);

    c.bench_function("small_plan", |b| {
        b.iter(|| {
            let document = SpecDocument::from_str(black_box(&source)).unwrap();
            TreeCompiler::new().plan(&document).unwrap()
        })
    });
}

fn bench_large_plan(c: &mut Criterion) {
    let source = wide_tree(20, 50);
    let document = SpecDocument::from_str(&source).unwrap();

    c.bench_function("large_plan", |b| {
        b.iter(|| TreeCompiler::new().plan(black_box(&document)).unwrap())
    });
}

fn bench_registry_build(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    for g in 0..10 {
        let dir = temp_dir.path().join(format!("section-{}", g));
        fs::create_dir_all(&dir).unwrap();
        for u in 0..20 {
            fs::write(
                dir.join(format!("Card{}.tsx", u)),
                format!(
                    "export interface Card{u}Props {{ title: string; count: number; tags: string[] }}\nexport function Card{u}(props: Card{u}Props) {{ return null; }}\n"
                ),
            )
            .unwrap();
        }
    }
    let builder = RegistryBuilder::new(temp_dir.path());

    c.bench_function("registry_build", |b| b.iter(|| builder.build().unwrap()));
}

criterion_group!(benches, bench_small_plan, bench_large_plan, bench_registry_build);
criterion_main!(benches);
