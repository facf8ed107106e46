/// Benchmarks for chunking and lexical search
use coderepo_rag::indexer::{CodeChunker, ContentNormalizer};
use coderepo_rag::types::FileMap;
use coderepo_rag::vector_db::LexicalIndex;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const REPO: &str = "https://github.com/acme/bench";

/// Helper to build a synthetic repository
fn create_test_files(count: usize) -> FileMap {
    let mut files = FileMap::new();
    for i in 0..count {
        let content = format!(
            r#"package com.acme.module{i};

import java.util.List;

// Service number {i}
public class OrderService{i} {{
    private final OrderRepository repository;

    public OrderService{i}(OrderRepository repository) {{
        this.repository = repository;
    }}

    public List<Order> findOrders(String customer) {{
        if (customer == null) {{
            return List.of();
        }}
        return repository.findByCustomer(customer);
    }}

    public int total(List<Order> orders) {{
        int sum = 0;
        for (Order order : orders) {{
            sum += order.amount() * {};
        }}
        return sum;
    }}
}}
"#,
            i + 1
        );
        files.insert(format!("src/module{}/OrderService{}.java", i, i), content);
    }
    files
}

fn benchmark_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let normalizer = ContentNormalizer::new();
    let chunker = CodeChunker::default();

    for file_count in [10, 100, 500].iter() {
        let files = normalizer.normalize_files(&create_test_files(*file_count)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            &files,
            |b, files| b.iter(|| black_box(chunker.chunk_files(REPO, files))),
        );
    }

    group.finish();
}

fn benchmark_lexical_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexical_search");
    let normalizer = ContentNormalizer::new();
    let chunker = CodeChunker::default();

    for file_count in [100, 1000].iter() {
        let files = normalizer.normalize_files(&create_test_files(*file_count)).unwrap();
        let index = LexicalIndex::new();
        index.insert(chunker.chunk_files(REPO, &files));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            &index,
            |b, index| {
                b.iter(|| black_box(index.search_chunks("order repository customer", None, 10)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_chunking, benchmark_lexical_search);
criterion_main!(benches);
