use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logflat::datetime::parse_datetime;
use logflat::flattener::LineFlattener;
use logflat::formatter::LineFormatter;

const HEADER: &str = "2016/09/14 02:33:01.465711 entity.go:179: [INFO] request served in 12ms";
const CONTINUATION: &str = "    at handler.serve (server.go:210)";

fn synthetic_log(records: usize, continuations: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(records * (continuations + 1));
    for _ in 0..records {
        lines.push(format!("{HEADER}\n"));
        for _ in 0..continuations {
            lines.push(format!("{CONTINUATION}\n"));
        }
    }
    lines
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    for continuations in [0usize, 4, 32] {
        let lines = synthetic_log(1_000, continuations);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(continuations),
            &lines,
            |b, lines| {
                b.iter(|| {
                    let mut flattener = LineFlattener::new("bench");
                    let mut records = 0usize;
                    for line in lines {
                        if flattener.push_line(black_box(line)).is_some() {
                            records += 1;
                        }
                    }
                    if flattener.flush().is_some() {
                        records += 1;
                    }
                    records
                });
            },
        );
    }
    group.finish();
}

fn bench_parse_datetime(c: &mut Criterion) {
    let literals = [
        "2016/09/14 02:33:01.465711",
        "2013-05-25 13:25:32,475",
        "2016-09-14 02:33:01.465711+02:00",
    ];

    let mut group = c.benchmark_group("parse_datetime");
    for literal in literals {
        group.bench_with_input(BenchmarkId::from_parameter(literal), literal, |b, literal| {
            b.iter(|| parse_datetime(black_box(literal)));
        });
    }
    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let mut flattener = LineFlattener::new("bench");
    flattener.push_line(HEADER);
    let record = flattener.flush();
    let formatter = LineFormatter::new("bench-host", "golog", vec!["env:bench".to_string()]);

    c.bench_function("format_record", |b| {
        b.iter(|| {
            if let Some(record) = &record {
                let _ = formatter.format(black_box(record));
            }
        });
    });
}

criterion_group!(benches, bench_flatten, bench_parse_datetime, bench_format);
criterion_main!(benches);
