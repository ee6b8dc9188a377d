use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use uuid::Uuid;

use alchemy_core::config::RankingWeights;
use alchemy_core::hashing::{hash_embedding_cache_key, hash_input_fingerprint, hash_prompt};
use alchemy_core::model::{Persona, Phase, Prompt};
use alchemy_core::ranker::{rank, score, RankerContext};

fn sample_prompt(persona: Persona, actual_tokens: u32, content_len: usize) -> Prompt {
    Prompt::builder("x".repeat(content_len), Phase::Solutio, Uuid::new_v4(), "origin idea", persona)
        .producer("openai", "gpt-4o-mini")
        .temperature(persona.target_temperature())
        .max_tokens(actual_tokens + 64)
        .actual_tokens(actual_tokens)
        .build()
}

fn candidate_pool(n: usize) -> Vec<Prompt> {
    (0..n)
        .map(|i| {
            let persona = match i % 4 {
                0 => Persona::Code,
                1 => Persona::Writing,
                2 => Persona::Analysis,
                _ => Persona::Generic,
            };
            sample_prompt(persona, 400 + (i as u32 * 37) % 1200, 200 + (i * 53) % 1800)
        })
        .collect()
}

fn bench_score_single(c: &mut Criterion) {
    let weights = RankingWeights::default();
    let prompt = sample_prompt(Persona::Code, 800, 900);
    let context = RankerContext {
        historical_success_rate: 0.82,
        semantic_similarity: 0.64,
    };

    c.bench_function("ranker_score_single", |b| {
        b.iter(|| score(black_box(&prompt), black_box(&weights), black_box(&context)));
    });
}

fn bench_rank_pool(c: &mut Criterion) {
    let weights = RankingWeights::default();
    let pool = candidate_pool(64);
    let contexts: Vec<RankerContext> = (0..pool.len())
        .map(|i| RankerContext {
            historical_success_rate: 0.5 + (i as f64 % 5.0) / 10.0,
            semantic_similarity: 0.3 + (i as f64 % 7.0) / 10.0,
        })
        .collect();

    c.bench_function("ranker_rank_64_candidates", |b| {
        b.iter_batched(
            || (pool.clone(), contexts.clone()),
            |(pool, contexts)| rank(black_box(&pool), black_box(&weights), black_box(&contexts)),
            BatchSize::SmallInput,
        );
    });
}

fn bench_hashing(c: &mut Criterion) {
    let content = "Design a REST API for user management with JWT authentication and role-based access control.";

    c.bench_function("hash_prompt_content", |b| {
        b.iter(|| hash_prompt(black_box(content)));
    });

    c.bench_function("hash_input_fingerprint", |b| {
        b.iter(|| {
            hash_input_fingerprint(
                black_box(content),
                black_box(Persona::Code),
                black_box(Phase::Solutio),
                black_box("openai"),
                black_box("gpt-4o-mini"),
                black_box(0.5),
            )
        });
    });

    c.bench_function("hash_embedding_cache_key", |b| {
        b.iter(|| hash_embedding_cache_key(black_box(content), black_box("text-embedding-3-small")));
    });
}

criterion_group!(ranker_benches, bench_score_single, bench_rank_pool, bench_hashing);
criterion_main!(ranker_benches);
