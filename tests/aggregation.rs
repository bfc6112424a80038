//! End-to-end aggregation over recorded data store responses

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;

use pharmwatch::services::aggregator::parse_timestamp;
use pharmwatch::services::{
    Aggregator, DashboardContext, DataLoaderService, DataStore, RefreshOutcome,
};
use pharmwatch::types::{
    LowStockPolicy, MedicineRecord, PharmacyRecord, PharmwatchError, Result, Session,
    SymptomLogRecord, ADDRESS_UNAVAILABLE, UNKNOWN_PHARMACY_ID,
};

/// Serves rows from `tests/fixtures/*.json`
struct FixtureStore {
    missing_table: Option<&'static str>,
}

impl FixtureStore {
    fn new() -> Self {
        Self {
            missing_table: None,
        }
    }

    fn load<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        if self.missing_table == Some(table) {
            return Err(PharmwatchError::Fetch(format!("{} returned HTTP 404", table)));
        }
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(format!("{}.json", table));
        let mut bytes = std::fs::read(path)?;
        simd_json::from_slice(&mut bytes).map_err(|e| PharmwatchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl DataStore for FixtureStore {
    async fn fetch_medicines(&self, _session: &Session) -> Result<Vec<MedicineRecord>> {
        self.load("medicines")
    }

    async fn fetch_pharmacies(&self, _session: &Session) -> Result<Vec<PharmacyRecord>> {
        self.load("pharmacies")
    }

    async fn fetch_symptom_logs(
        &self,
        _session: &Session,
        limit: usize,
    ) -> Result<Vec<SymptomLogRecord>> {
        let mut rows: Vec<SymptomLogRecord> = self.load("symptom_logs")?;
        rows.truncate(limit);
        Ok(rows)
    }
}

fn local_date(raw: &str) -> NaiveDate {
    parse_timestamp(raw)
        .unwrap()
        .with_timezone(&Local)
        .date_naive()
}

#[tokio::test]
async fn test_fixture_pharmacies() {
    let loader = DataLoaderService::new(FixtureStore::new(), 500);

    let result = loader.load_and_aggregate(&Session::new("token")).await;
    assert!(result.is_ok());
    let pharmacies = &result.data.pharmacies;

    let names: Vec<&str> = pharmacies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Central Pharmacy", "Harbour Chemist", "Roadside Drugs"]
    );

    // Duplicate "Central Pharmacy" record: first one wins
    assert_eq!(pharmacies[0].id, "10");
    assert_eq!(pharmacies[0].address, "1 Main St");
    assert_eq!(pharmacies[0].inventory.len(), 2);
    assert_eq!(pharmacies[0].inventory[0].pharmacy_id, "10");

    assert_eq!(pharmacies[1].address, ADDRESS_UNAVAILABLE);
    assert_eq!(pharmacies[1].inventory[0].medicine.name, "Oseltamivir");
    assert_eq!(pharmacies[1].inventory[0].id, "3");

    // No pharmacy record at all
    assert_eq!(pharmacies[2].id, "Roadside Drugs");
    assert_eq!(pharmacies[2].inventory[0].pharmacy_id, UNKNOWN_PHARMACY_ID);
    assert_eq!(pharmacies[2].inventory[0].last_updated, None);
    // numeric column value 12.5
    assert_eq!(pharmacies[2].inventory[0].quantity, 12);

    // Rows with empty or null pharmacy are dropped
    let total: usize = pharmacies.iter().map(|p| p.inventory.len()).sum();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn test_fixture_summary() {
    let loader = DataLoaderService::new(FixtureStore::new(), 500);
    let result = loader.load_and_aggregate(&Session::new("token")).await;
    let today = local_date("2025-03-03T10:00:00Z");

    let summary = Aggregator::summarize(&result.data, &LowStockPolicy::default(), 5, today);

    let trends: Vec<(&str, u64)> = summary
        .symptom_trends
        .iter()
        .map(|t| (t.name.as_str(), t.count))
        .collect();
    assert_eq!(
        trends,
        vec![
            ("fever", 2),
            ("cough", 2),
            ("headache", 1),
            ("diarrhea", 1),
            ("rash", 1)
        ]
    );
    assert_eq!(summary.highest_symptom.as_deref(), Some("fever"));

    let heat: Vec<(&str, u64)> = summary
        .district_heat
        .iter()
        .map(|h| (h.district.as_str(), h.count))
        .collect();
    assert_eq!(heat, vec![("Kasoa", 2), ("Ablekuma", 1)]);

    let low: Vec<&str> = summary
        .low_stock
        .iter()
        .map(|i| i.medicine_name.as_str())
        .collect();
    assert_eq!(low, vec!["Paracetamol", "ORS"]);
    assert_eq!(summary.low_stock_count, 2);

    let fixture_timestamps = [
        "2025-03-03T10:00:00Z",
        "2025-03-03T09:00:00Z",
        "2025-03-02T18:30:00Z",
        "2025-03-02T12:00:00",
    ];
    let expected_today = fixture_timestamps
        .iter()
        .filter(|ts| local_date(ts) == today)
        .count() as u64;
    assert_eq!(summary.reports_today, expected_today);
    assert!(expected_today >= 1);

    let day_before = local_date("2025-03-02T12:00:00");
    let expected_day_before = fixture_timestamps
        .iter()
        .filter(|ts| local_date(ts) == day_before)
        .count() as u64;
    assert_eq!(
        Aggregator::reports_on(&result.data.symptom_logs, day_before),
        expected_day_before
    );
    let far_past = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    assert_eq!(Aggregator::reports_on(&result.data.symptom_logs, far_past), 0);
}

#[tokio::test]
async fn test_fixture_symptom_limit() {
    let loader = DataLoaderService::new(FixtureStore::new(), 2);

    let result = loader.load_and_aggregate(&Session::new("token")).await;

    assert_eq!(result.data.symptom_logs.len(), 2);
    assert_eq!(result.data.symptom_logs[0].id, "100");
}

#[tokio::test]
async fn test_missing_table_publishes_empty_snapshot() {
    let store = FixtureStore {
        missing_table: Some("symptom_logs"),
    };
    let context = DashboardContext::new(DataLoaderService::new(store, 500));

    let outcome = context.sign_in(Session::new("token")).await;

    match outcome {
        RefreshOutcome::Failed(failure) => {
            assert_eq!(failure.errors.len(), 1);
            assert!(failure.errors[0].contains("symptom_logs"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    let snapshot = context.snapshot();
    assert!(snapshot.data.pharmacies.is_empty());
    assert!(snapshot.data.symptom_logs.is_empty());
}

#[tokio::test]
async fn test_context_round_trip() {
    let context = DashboardContext::new(DataLoaderService::new(FixtureStore::new(), 500));

    assert_eq!(
        context.sign_in(Session::new("token")).await,
        RefreshOutcome::Applied
    );
    assert_eq!(context.snapshot().data.pharmacies.len(), 3);

    context.sign_out();
    assert!(context.snapshot().data.is_empty());
    assert_eq!(context.refresh().await, RefreshOutcome::NoSession);
}
