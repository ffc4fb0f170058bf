//! Performance benchmarks for the Payroll Engine.
//!
//! This benchmark suite verifies that the engine meets performance targets:
//! - Single payroll calculation through the router: < 200μs mean
//! - Batch of 100 payroll calculations: < 20ms mean
//! - Standard remuneration evaluation: < 100μs mean
//! - Resident tax CSV preview of 1000 rows: < 50ms mean
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::NaiveDate;
use payroll_engine::api::{AppState, create_router};
use payroll_engine::calculation::{
    PayrollCalculator, RunPayrollCommand, TableSocialInsuranceCalculator, TableTaxCalculator,
    evaluate_standard_remuneration, import_resident_tax_notices, run_payroll,
};
use payroll_engine::config::ConfigLoader;
use payroll_engine::store::InMemoryStore;

use axum::{body::Body, http::Request};
use rust_decimal::Decimal;
use tower::ServiceExt;

fn load_fixtures() -> (ConfigLoader, InMemoryStore) {
    let config = ConfigLoader::load("./config/jp2024").expect("Failed to load config");
    let store = InMemoryStore::load("./data/seed.yaml", config.tables()).expect("Failed to load seed");
    (config, store)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn payroll_body(bonus: Option<u32>) -> String {
    let mut body = serde_json::json!({
        "employeeId": 1,
        "payrollDate": "2024-06-25",
        "periodStart": "2024-06-01",
        "periodEnd": "2024-06-30",
        "baseSalary": 300000,
        "overtimeHours": 12,
        "allowances": [{ "itemCode": "FAMILY_ALLOWANCE", "amount": 10000 }]
    });
    if let Some(bonus) = bonus {
        body["bonusAmount"] = serde_json::json!(bonus);
    }
    body.to_string()
}

fn command(employee_id: u64, base_salary: u32) -> RunPayrollCommand {
    RunPayrollCommand {
        employee_id,
        payroll_date: date(2024, 6, 25),
        period_start: date(2024, 6, 1),
        period_end: date(2024, 6, 30),
        base_salary: Some(Decimal::from(base_salary)),
        overtime_hours: Some(Decimal::from(8)),
        overtime_rate: None,
        allowances: vec![],
        deductions: vec![],
        bonus_amount: None,
        include_resident_tax: true,
    }
}

/// Benchmark: Monthly and bonus payroll through the HTTP router.
///
/// Target: < 200μs mean
fn bench_payroll_endpoint(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (config, store) = load_fixtures();
    let router = create_router(AppState::new(config, store));

    let mut group = c.benchmark_group("payroll_endpoint");
    for (name, bonus) in [("monthly", None), ("bonus", Some(500000))] {
        let body = payroll_body(bonus);
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| async {
                let router = router.clone();
                let response = router
                    .oneshot(
                        Request::builder()
                            .method("POST")
                            .uri("/api/payroll/calculate")
                            .header("Content-Type", "application/json")
                            .body(Body::from(body.clone()))
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                black_box(response)
            })
        });
    }
    group.finish();
}

/// Benchmark: Batch of 100 payroll runs without HTTP.
///
/// Target: < 20ms mean
fn bench_payroll_batch(c: &mut Criterion) {
    let (config, store) = load_fixtures();
    let calculator = PayrollCalculator::new(
        TableSocialInsuranceCalculator::new(config.tables()),
        TableTaxCalculator::new(config.tables(), &store),
    );
    let commands: Vec<RunPayrollCommand> = (0..100u32)
        .map(|i| command(u64::from(i % 3 + 1), 200000 + i * 1500))
        .collect();

    let mut group = c.benchmark_group("batch_processing");
    group.throughput(Throughput::Elements(commands.len() as u64));
    group.bench_function("batch_100", |b| {
        b.iter(|| {
            let results: Vec<_> = commands
                .iter()
                .map(|command| run_payroll(&store, &calculator, command).unwrap())
                .collect();
            black_box(results)
        })
    });
    group.finish();
}

/// Benchmark: Standard remuneration evaluation.
///
/// Target: < 100μs mean
fn bench_standard_remuneration(c: &mut Criterion) {
    let (config, store) = load_fixtures();
    let rates = config.tables().insurance_rates();

    c.bench_function("standard_remuneration", |b| {
        b.iter(|| {
            black_box(
                evaluate_standard_remuneration(&store, rates, black_box(1), date(2024, 6, 30))
                    .unwrap(),
            )
        })
    });
}

/// Benchmark: Resident tax CSV preview at several sizes.
fn bench_resident_tax_import(c: &mut Criterion) {
    let (_, store) = load_fixtures();

    let mut group = c.benchmark_group("resident_tax_import");
    for rows in [10usize, 100, 1000] {
        let mut csv = String::from("employeeCode,fiscalYear,annualTax,bonusWithholding,startMonth\n");
        for i in 0..rows {
            csv.push_str(&format!("E00{},2024,{},{},6\n", i % 3 + 1, 90000 + i, i % 2 * 12000));
        }

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("preview", rows), &csv, |b, csv| {
            b.iter(|| black_box(import_resident_tax_notices(&store, csv, false).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_payroll_endpoint,
    bench_payroll_batch,
    bench_standard_remuneration,
    bench_resident_tax_import,
);
criterion_main!(benches);
