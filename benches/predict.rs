use bankmark_serve::schema::bank_marketing;
use bankmark_serve::{NormalizedRecord, Pipeline, PredictionEngine, Predictor, RawRecord, Validator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::PathBuf;
use std::sync::Arc;

/// Load the shipped pipeline once for every benchmark group
fn load() -> (Arc<bankmark_serve::SchemaRegistry>, Arc<Pipeline>) {
    let path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/bank_marketing_pipeline.json");
    let schema = bank_marketing().expect("Failed to build schema");
    let pipeline = Pipeline::load_from_file(path).expect("Failed to load pipeline");
    (Arc::new(schema), Arc::new(pipeline))
}

fn client(age: i32) -> RawRecord {
    RawRecord::new()
        .with("age", age)
        .with("occupation", "technician")
        .with("marital_status", "married")
        .with("education", "professional.course")
        .with("has_credit", "no")
        .with("housing_loan", "yes")
        .with("personal_loan", "no")
        .with("contact_mode", "cellular")
        .with("month", "aug")
        .with("week_day", "wed")
        .with("last_contact_duration", 180 + age)
        .with("contacts_per_campaign", 2)
        .with("emp_var_rate", 1.4)
        .with("cons_price_index", 93.444)
        .with("cons_conf_index", -36.1)
        .with("euri_3_month", 4.963)
        .with("nb_employees", 5228)
}

fn bench_validate(c: &mut Criterion) {
    let (schema, _) = load();
    let validator = Validator::new(schema);
    let raw = client(41);

    c.bench_function("validate_one", |b| {
        b.iter(|| black_box(validator.validate_one(black_box(&raw))));
    });
}

fn bench_predict_single(c: &mut Criterion) {
    let (schema, pipeline) = load();
    let validator = Validator::new(Arc::clone(&schema));
    let engine = PredictionEngine::new(pipeline, schema).expect("Failed to build engine");
    let record = validator.validate_one(&client(41)).expect("Invalid record");

    c.bench_function("predict_one", |b| {
        b.iter(|| black_box(engine.predict_one(black_box(&record))));
    });
}

fn bench_single_vs_batch(c: &mut Criterion) {
    let (schema, pipeline) = load();
    let validator = Validator::new(Arc::clone(&schema));
    let engine = PredictionEngine::new(pipeline, schema).expect("Failed to build engine");

    let mut group = c.benchmark_group("single_vs_batch");
    for batch_size in [1usize, 10, 100, 1000] {
        let records: Vec<NormalizedRecord> = (0..batch_size)
            .map(|i| {
                validator
                    .validate_one(&client(20 + (i % 60) as i32))
                    .expect("Invalid record")
            })
            .collect();
        group.throughput(Throughput::Elements(batch_size as u64));

        group.bench_with_input(BenchmarkId::new("loop_one", batch_size), &records, |b, rs| {
            b.iter(|| {
                for r in rs {
                    black_box(engine.predict_one(black_box(r)).ok());
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("many", batch_size), &records, |b, rs| {
            b.iter(|| black_box(engine.predict_many(black_box(rs))));
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let (schema, pipeline) = load();
    let predictor = Predictor::new(schema, pipeline).expect("Failed to build predictor");
    let raws: Vec<RawRecord> = (0..256).map(|i| client(20 + i % 60)).collect();

    c.bench_function("predict_batch_raw_256", |b| {
        b.iter(|| black_box(predictor.predict_batch(black_box(&raws))));
    });
}

criterion_group!(
    benches,
    bench_validate,
    bench_predict_single,
    bench_single_vs_batch,
    bench_end_to_end
);
criterion_main!(benches);
