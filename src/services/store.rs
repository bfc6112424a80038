//! Remote data store access
//!
//! The store exposes a PostgREST-style interface: one `GET /rest/v1/<table>`
//! per query, authorized with the project key plus the session's bearer token.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::types::{
    MedicineRecord, PharmacyRecord, PharmwatchError, Result, Session, SymptomLogRecord,
};

pub const MEDICINES_TABLE: &str = "medicines";
pub const PHARMACIES_TABLE: &str = "pharmacies";
pub const SYMPTOM_LOGS_TABLE: &str = "symptom_logs";

/// Read-only queries the aggregator needs from the data store
#[async_trait]
pub trait DataStore: Send + Sync {
    /// All medicine rows
    async fn fetch_medicines(&self, session: &Session) -> Result<Vec<MedicineRecord>>;

    /// All pharmacy rows
    async fn fetch_pharmacies(&self, session: &Session) -> Result<Vec<PharmacyRecord>>;

    /// Most recent `limit` symptom logs, newest first
    async fn fetch_symptom_logs(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<SymptomLogRecord>>;
}

/// HTTP implementation of [`DataStore`]
pub struct RestDataStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl RestDataStore {
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PharmwatchError::Http(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        session: &Session,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.table_url(table);
        tracing::debug!(table, "querying data store");

        let response = self
            .client
            .get(&url)
            .query(&[("select", "*")])
            .query(params)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PharmwatchError::Http(format!("{}: request timed out", table))
                } else {
                    PharmwatchError::Http(format!("{}: {}", table, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PharmwatchError::Fetch(format!(
                "{} returned HTTP {}: {}",
                table,
                status.as_u16(),
                body.trim()
            )));
        }

        let mut bytes = response
            .bytes()
            .await
            .map_err(|e| PharmwatchError::Http(format!("{}: {}", table, e)))?
            .to_vec();

        let rows: Vec<T> = simd_json::from_slice(&mut bytes)
            .map_err(|e| PharmwatchError::Parse(format!("{}: {}", table, e)))?;

        tracing::debug!(table, rows = rows.len(), "data store query complete");
        Ok(rows)
    }
}

#[async_trait]
impl DataStore for RestDataStore {
    async fn fetch_medicines(&self, session: &Session) -> Result<Vec<MedicineRecord>> {
        self.select(session, MEDICINES_TABLE, &[]).await
    }

    async fn fetch_pharmacies(&self, session: &Session) -> Result<Vec<PharmacyRecord>> {
        self.select(session, PHARMACIES_TABLE, &[]).await
    }

    async fn fetch_symptom_logs(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<SymptomLogRecord>> {
        let params = [
            ("order", "timestamp.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        self.select(session, SYMPTOM_LOGS_TABLE, &params).await
    }
}
