use climgrid::{resolve_span, ClimateVariable, DailySeries, RowBuffer, SeriesRequest};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn filled_buffer() -> RowBuffer {
    let mut buffer = RowBuffer::new();
    for lon in [148.0, 148.05, 148.1, 148.15] {
        for variable in [ClimateVariable::DailyRain, ClimateVariable::MaxTemp] {
            let request = SeriesRequest::new(-35.0, lon, 2020, variable);
            let values = (0..366).map(|d| d as f64 * 0.1).collect();
            if let Ok(series) = DailySeries::from_values(request, values) {
                buffer.push_series(&series);
            }
        }
    }
    buffer
}

fn bench_climgrid(c: &mut Criterion) {
    c.bench_function("resolve_span", |b| {
        b.iter(|| resolve_span(black_box(-44.0), black_box(-10.0), black_box(0.05)))
    });
    c.bench_function("into_frame", |b| {
        b.iter_batched(
            filled_buffer,
            |buffer| buffer.into_frame(&[ClimateVariable::DailyRain, ClimateVariable::MaxTemp]),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_climgrid);
criterion_main!(benches);
