use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stellaris_save::text::{to_string, Document, TreeParser};
use stellaris_save::StellarisSave;

const META: &str = include_str!("../tests/fixtures/save/meta");
const GAMESTATE: &str = include_str!("../tests/fixtures/save/gamestate");

/// A gamestate grown by repeating its systems under fresh ids
fn scaled_gamestate(copies: usize) -> String {
    let mut result = String::from("galactic_object={\n");
    for i in 0..copies {
        result.push_str(&format!(
            "\t{}={{\n\t\tcoordinate={{\n\t\t\tx={}\n\t\t\ty={}\n\t\t\torigin=4294967295\n\t\t}}\n\t\tname=\"System {}\"\n\t\thyperlane={{\n\t\t\t{{\n\t\t\t\tto={}\n\t\t\t\tlength=10\n\t\t\t}}\n\t\t}}\n\t}}\n",
            i,
            i % 500,
            i / 500,
            i,
            (i + 1) % copies
        ));
    }
    result.push_str("}\n");
    result.push_str(GAMESTATE);
    result
}

pub fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for copies in [100, 1_000, 10_000].iter() {
        let data = scaled_gamestate(*copies);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(copies), &data, |b, data| {
            b.iter(|| TreeParser::new().parse(black_box(data)).unwrap())
        });
    }
    group.finish();
}

pub fn write_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    for copies in [100, 1_000, 10_000].iter() {
        let data = scaled_gamestate(*copies);
        let doc = Document::parse(&data).unwrap();
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(copies), &doc, |b, doc| {
            b.iter(|| to_string(doc.tree(), doc.root().id()))
        });
    }
    group.finish();
}

pub fn save_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.throughput(Throughput::Bytes((META.len() + GAMESTATE.len()) as u64));
    group.bench_function("index", |b| {
        b.iter(|| StellarisSave::from_strs(black_box(META), black_box(GAMESTATE)).unwrap())
    });
    group.bench_function("closest-systems", |b| {
        let data = scaled_gamestate(5_000);
        let save = StellarisSave::from_strs(META, &data).unwrap();
        b.iter(|| save.find_systems_closest_to_system(black_box(0), Some(10)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, parse_benchmark, write_benchmark, save_benchmark);
criterion_main!(benches);
