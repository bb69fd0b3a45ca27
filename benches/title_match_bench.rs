use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use url::Url;

use scholar_citation_scrape::extract::{normalize_title, parse_results, select_match, titles_match};

fn bench_normalize_title(c: &mut Criterion) {
    let titles = vec![
        "Deep Learning Survey",
        "[PDF] \u{201c}Attention Is All You Need\u{201d}",
        "[CITATION][C] Notes on the   Analytical Engine \u{2013} a sketch",
        "\"'Quoted' titles with\u{a0}non-breaking spaces\"",
        "Ｆｕｌｌｗｉｄｔｈ ｔｉｔｌｅ",
    ];

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(titles.len() as u64));

    group.bench_function("normalize_title", |b| {
        b.iter(|| {
            for title in &titles {
                black_box(normalize_title(title));
            }
        })
    });

    group.bench_function("titles_match", |b| {
        b.iter(|| {
            for title in &titles {
                black_box(titles_match(title, "deep learning survey"));
            }
        })
    });

    group.finish();
}

fn bench_select_match(c: &mut Criterion) {
    let base = Url::parse("https://scholar.google.com").unwrap();
    let page: String = (0..10)
        .map(|i| {
            format!(
                r#"<div class="gs_r gs_or gs_scl">
                   <h3 class="gs_rt">
                     <a href="https://e.org/{i}">[PDF] Deep Learning Survey Part {i}</a>
                   </h3>
                   <div class="gs_a">
                     <a href="/citations?user=u{i}">Author {i}</a> - Venue, 2020
                   </div>
                   <div class="gs_rs">Snippet number {i}</div>
                   <div class="gs_fl"><a href="/scholar?cites={i}">Cited by {i}</a></div></div>"#
            )
        })
        .collect();
    let results = parse_results(&page, &base);

    c.bench_function("parse_results", |b| b.iter(|| black_box(parse_results(&page, &base))));

    c.bench_function("select_match", |b| {
        b.iter(|| {
            black_box(select_match("Deep Learning Survey Part 9", &results));
            black_box(select_match("Deep Learning Survey", &results));
        })
    });
}

criterion_group!(benches, bench_normalize_title, bench_select_match);
criterion_main!(benches);
