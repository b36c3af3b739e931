use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dasha_base::dasha::{
    DashaLevel, DashaSystem, DurationInput, TimelineOptions, build_timeline, format_duration,
    group_cycles, locate_current, normalize_periods,
};
use serde_json::{Value, json};

const PLANETS: [&str; 8] = ["Su", "Mo", "Ma", "Me", "Ju", "Ve", "Sa", "Ra"];

fn records(count: usize, with_children: bool) -> Vec<Value> {
    let origin = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let start = origin + Duration::days(365 * i as i64);
            let end = start + Duration::days(365);
            let mut rec = json!({
                "planet": PLANETS[i % PLANETS.len()],
                "startDate": start.format("%Y-%m-%d").to_string(),
                "endDate": end.format("%Y-%m-%d").to_string(),
            });
            if with_children {
                rec["subPeriods"] = Value::Array(
                    (0..8)
                        .map(|j| {
                            let s = start + Duration::days(45 * j);
                            json!({
                                "planet": PLANETS[j as usize],
                                "start": s.to_rfc3339(),
                                "end": (s + Duration::days(45)).to_rfc3339(),
                            })
                        })
                        .collect(),
                );
            }
            rec
        })
        .collect()
}

fn normalize_bench(c: &mut Criterion) {
    let flat = records(72, false);
    let nested = records(72, true);

    let mut group = c.benchmark_group("normalize");
    group.bench_function("flat_72", |b| {
        b.iter(|| normalize_periods(black_box(&flat), None, DashaLevel::Mahadasha))
    });
    group.bench_function("nested_72x8", |b| {
        b.iter(|| normalize_periods(black_box(&nested), None, DashaLevel::Mahadasha))
    });
    group.finish();
}

fn annotate_bench(c: &mut Criterion) {
    let nodes = normalize_periods(&records(72, true), None, DashaLevel::Mahadasha).nodes;
    let now = Utc.with_ymd_and_hms(1950, 6, 1, 0, 0, 0).unwrap();

    let mut group = c.benchmark_group("annotate");
    group.bench_function("locate_current", |b| {
        b.iter(|| locate_current(black_box(&nodes), black_box(now)))
    });
    group.bench_function("group_cycles", |b| {
        b.iter(|| group_cycles(black_box(&nodes), 8))
    });
    group.finish();
}

fn pipeline_bench(c: &mut Criterion) {
    let payload = json!({ "periods": records(72, false) });
    let opts = TimelineOptions::for_system(DashaSystem::DwisaptatiSama);
    let now = Utc.with_ymd_and_hms(1950, 6, 1, 0, 0, 0).unwrap();
    let span = DurationInput::from_span(
        Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 4, 13, 0, 0, 0).unwrap(),
    );

    let mut group = c.benchmark_group("pipeline");
    group.bench_function("build_timeline_dwisaptati", |b| {
        b.iter(|| build_timeline(black_box(&payload), &opts, now))
    });
    group.bench_function("format_duration_span", |b| {
        b.iter(|| format_duration(black_box(&span)))
    });
    group.finish();
}

criterion_group!(benches, normalize_bench, annotate_bench, pipeline_bench);
criterion_main!(benches);
