use carecycle_core::models::RecurrenceRule;
use carecycle_core::recurrence::RecurrenceScheduler;
use carecycle_core::validation::{validate, RawRecurrenceRule};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

fn base_raw(pattern_type: &str) -> RawRecurrenceRule {
    let mut raw = RawRecurrenceRule::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    raw.pattern_type = Some(pattern_type.to_string());
    raw.interval_value = Some(1);
    raw.end_type = Some("never".to_string());
    raw
}

fn test_rules() -> Vec<(&'static str, RecurrenceRule)> {
    let daily = base_raw("daily");

    let mut weekly = base_raw("weekly");
    weekly.weekly_days = Some(vec![1, 3, 5]);

    let mut monthly_dom = base_raw("monthly");
    monthly_dom.day_of_month = Some(31);

    let mut monthly_nth = base_raw("monthly");
    monthly_nth.nth_occurrence = Some(5);
    monthly_nth.weekday = Some(2);

    let mut yearly = base_raw("yearly");
    yearly.month = Some(2);
    yearly.day = Some(29);

    [
        ("daily", daily),
        ("weekly", weekly),
        ("monthly_day_of_month", monthly_dom),
        ("monthly_nth_weekday", monthly_nth),
        ("yearly", yearly),
    ]
    .into_iter()
    .map(|(name, raw)| {
        let definition = validate(&raw).expect("benchmark rule should validate");
        (name, RecurrenceRule::new(Uuid::now_v7(), Uuid::now_v7(), definition))
    })
    .collect()
}

fn bench_validation(c: &mut Criterion) {
    let mut raw = base_raw("monthly");
    raw.nth_occurrence = Some(2);
    raw.weekday = Some(4);

    c.bench_function("validate_monthly_rule", |b| {
        b.iter(|| validate(black_box(&raw)))
    });
}

fn bench_schedule(c: &mut Criterion) {
    let anchor = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let mut group = c.benchmark_group("schedule");

    for (name, rule) in test_rules() {
        group.bench_with_input(BenchmarkId::new("pattern", name), &rule, |b, rule| {
            let scheduler = RecurrenceScheduler::new(rule);
            b.iter(|| scheduler.schedule(black_box(anchor)))
        });
    }
    group.finish();
}

fn bench_preview(c: &mut Criterion) {
    let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let rules = test_rules();
    let (_, weekly) = &rules[1];
    let scheduler = RecurrenceScheduler::new(weekly);

    let mut group = c.benchmark_group("preview");
    for count in [5usize, 52, 365] {
        group.bench_with_input(BenchmarkId::new("occurrences", count), &count, |b, &count| {
            b.iter(|| scheduler.preview(black_box(anchor), count))
        });
    }
    group.finish();
}

fn bench_random_anchors(c: &mut Criterion) {
    let rules = test_rules();
    let (_, monthly) = &rules[2];
    let scheduler = RecurrenceScheduler::new(monthly);
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let anchors: Vec<NaiveDate> = (0..1_000)
        .map(|_| base + chrono::Duration::days(fastrand::i64(0..36_500)))
        .collect();

    c.bench_function("schedule_random_anchors", |b| {
        b.iter(|| {
            for anchor in &anchors {
                black_box(scheduler.schedule(*anchor));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_validation,
    bench_schedule,
    bench_preview,
    bench_random_anchors
);
criterion_main!(benches);
