use criterion::{criterion_group, criterion_main, Criterion};
use engine::tokenizer::canonical_tokens;

fn sample_posting() -> String {
    let block = "Senior C++ Backend Engineer\n\nWe build low-latency trading infrastructure. \
        You will design server-side services in modern C++, profile hot paths on Linux, \
        and own deployments with Docker and Kubernetes.\n\nRequirements:\n5+ years of C++\n\
        Strong Linux fundamentals\nExperience with gRPC and Protocol Buffers\n\nBenefits:\n\
        Competitive compensation\n";
    block.repeat(40)
}

fn bench_canonical_tokens(c: &mut Criterion) {
    let text = sample_posting();
    c.bench_function("canonical_tokens_posting", |b| b.iter(|| canonical_tokens(&text)));
}

criterion_group!(benches, bench_canonical_tokens);
criterion_main!(benches);
