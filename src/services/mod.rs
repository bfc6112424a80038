//! Services for data loading, aggregation and analysis

pub mod aggregator;
pub mod auth;
pub mod context;
pub mod data_loader;
pub mod insights;
pub mod store;

pub use aggregator::Aggregator;
pub use auth::AuthClient;
pub use context::{DashboardContext, DashboardSnapshot, RefreshOutcome};
pub use data_loader::{DataLoaderService, FetchFailure, LoadResult};
pub use insights::{AnalysisClient, GeminiClient, InsightService};
pub use store::{DataStore, RestDataStore};
