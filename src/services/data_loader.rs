//! Data loading service: fan out the three store queries, then aggregate
//!
//! A cycle either produces a complete [`DashboardData`] or, if any query
//! fails, the empty state plus a [`FetchFailure`]. Partial results are never
//! combined.

use thiserror::Error;

use crate::services::store::DataStore;
use crate::services::Aggregator;
use crate::types::{DashboardData, Session};

/// Default number of symptom logs fetched per cycle
pub const DEFAULT_SYMPTOM_LOG_LIMIT: usize = 500;

/// One or more of the required queries failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch dashboard data: {}", .errors.join("; "))]
pub struct FetchFailure {
    /// One message per failed query
    pub errors: Vec<String>,
}

/// Result of one aggregation cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadResult {
    pub data: DashboardData,
    pub failure: Option<FetchFailure>,
}

impl LoadResult {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Loads rows from a [`DataStore`] and reshapes them for the dashboard
pub struct DataLoaderService<S> {
    store: S,
    symptom_log_limit: usize,
}

impl<S: DataStore> DataLoaderService<S> {
    pub fn new(store: S, symptom_log_limit: usize) -> Self {
        Self {
            store,
            symptom_log_limit,
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    /// Run one fetch-then-transform cycle.
    ///
    /// The three queries run concurrently and are all awaited before any
    /// aggregation happens.
    pub async fn load_and_aggregate(&self, session: &Session) -> LoadResult {
        let (medicines, pharmacies, symptom_logs) = tokio::join!(
            self.store.fetch_medicines(session),
            self.store.fetch_pharmacies(session),
            self.store
                .fetch_symptom_logs(session, self.symptom_log_limit),
        );

        match (medicines, pharmacies, symptom_logs) {
            (Ok(medicines), Ok(pharmacies), Ok(symptom_logs)) => {
                let pharmacies = Aggregator::build_pharmacies(&medicines, &pharmacies);
                tracing::info!(
                    medicines = medicines.len(),
                    pharmacies = pharmacies.len(),
                    symptom_logs = symptom_logs.len(),
                    "aggregation complete"
                );
                LoadResult {
                    data: DashboardData {
                        pharmacies,
                        symptom_logs,
                    },
                    failure: None,
                }
            }
            (medicines, pharmacies, symptom_logs) => {
                let errors: Vec<String> = [
                    medicines.err(),
                    pharmacies.err(),
                    symptom_logs.err(),
                ]
                .into_iter()
                .flatten()
                .map(|e| e.to_string())
                .collect();

                for error in &errors {
                    tracing::error!(%error, "data store query failed");
                }

                LoadResult {
                    data: DashboardData::default(),
                    failure: Some(FetchFailure { errors }),
                }
            }
        }
    }
}
