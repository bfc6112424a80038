//! Public-health dashboard core: pharmacy inventory and symptom aggregation

pub mod cli;
pub mod config;
pub mod services;
pub mod types;
