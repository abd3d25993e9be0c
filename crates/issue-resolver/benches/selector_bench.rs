//! 이슈 리졸버 벤치마크
//!
//! purl 파싱, 요구사항 해석, 버전 선택, LDB 출력 파싱 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use purlsight_issue_resolver::store::client::{parse_issues, parse_pivot};
use purlsight_issue_resolver::{
    ComponentRecord, PurlQuery, RequirementConstraint, SelectionMode, VersionSelector,
    resolve_purl,
};

fn records(count: usize) -> Vec<ComponentRecord> {
    (0..count)
        .map(|i| ComponentRecord {
            url_hash: format!("{i:032x}"),
            component: "lodash".to_owned(),
            version: format!("{}.{}.{}", i % 7, i % 13, i % 29),
            semver: String::new(),
            purl_name: "lodash".to_owned(),
            purl_type: "npm".to_owned(),
            mine_id: 1,
        })
        .collect()
}

fn pivot_output(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("{:032x},{:032x},1\n", i / 10, i))
        .collect()
}

fn issues_output(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("{i:032x},javascript.lang.security.rule-{i},{},{},WARNING\n", i, i + 3))
        .collect()
}

fn bench_purl_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("purl_resolution");

    group.throughput(Throughput::Elements(1));
    group.bench_function("versioned_purl", |b| {
        let query = PurlQuery::new("pkg:npm/%40angular/core@16.2.0?arch=x86#src", "");
        b.iter(|| resolve_purl(black_box(&query)));
    });
    group.bench_function("range_requirement", |b| {
        b.iter(|| RequirementConstraint::parse(black_box(">=1.2.3 <2.0.0 || ^3.1 || 4.0.0 - 4.5.0")));
    });

    group.finish();
}

fn bench_version_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_selection");
    let resolved = resolve_purl(&PurlQuery::new("pkg:npm/lodash", "^4.0.0 || >=5.1.0"))
        .expect("bench purl must resolve");

    for size in &[10usize, 100, 1000] {
        let candidates = records(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("closest", size), size, |b, _| {
            let selector = VersionSelector::new(SelectionMode::Closest);
            b.iter(|| selector.select(black_box(&resolved), black_box(&candidates)));
        });
    }

    group.finish();
}

fn bench_store_output_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_output_parsing");
    let pivot = pivot_output(1000);
    let issues = issues_output(1000);

    group.throughput(Throughput::Elements(1000));
    group.bench_function("pivot_1000_lines", |b| {
        b.iter(|| parse_pivot(black_box(&pivot)));
    });
    group.bench_function("issues_1000_lines", |b| {
        b.iter(|| parse_issues(black_box(&issues)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_purl_resolution,
    bench_version_selection,
    bench_store_output_parsing
);
criterion_main!(benches);
