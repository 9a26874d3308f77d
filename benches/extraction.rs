//! Benchmarks for the per-turn interpretation steps.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ammie::config::MemoryStore;
use ammie::engine::DialogueEngine;
use ammie::evolution::OfflineAgent;
use ammie::seeds;

const UTTERANCES: [&str; 4] = [
    "你会唱歌吗",
    "我到家了，你能跟我聊天吗",
    "你会骗人吗",
    "今天天气怎么样",
];

fn bench_extract(c: &mut Criterion) {
    let symbols = seeds::symbols();

    c.bench_function("extract_seed_table", |bench| {
        bench.iter(|| {
            for text in UTTERANCES {
                black_box(symbols.extract(black_box(text)));
            }
        })
    });
}

fn bench_match_rule(c: &mut Criterion) {
    let symbols = seeds::symbols();
    let extraction = symbols.extract("你会唱歌吗");

    c.bench_function("match_rule_seed_table", |bench| {
        bench.iter(|| black_box(symbols.match_rule(black_box(&extraction))))
    });
}

fn bench_turn(c: &mut Criterion) {
    let store = MemoryStore::new(seeds::default_configuration());
    let mut engine = DialogueEngine::open(store, OfflineAgent).unwrap();

    c.bench_function("process_turn", |bench| {
        bench.iter(|| black_box(engine.process(black_box("你能跟我聊天吗"))))
    });
}

criterion_group!(benches, bench_extract, bench_match_rule, bench_turn);
criterion_main!(benches);
