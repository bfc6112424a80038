pub mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::services::insights::DEFAULT_QUERY;
use crate::services::{
    Aggregator, AuthClient, DashboardContext, DataLoaderService, GeminiClient, InsightService,
    RefreshOutcome, RestDataStore,
};
use crate::types::{DistrictHeatPoint, PharmwatchError, Session, SymptomTrendPoint};

/// Pharmacy inventory and symptom surveillance dashboard
#[derive(Parser)]
#[command(name = "pharmwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.pharmwatch/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Sign in with this email (password from PHARMWATCH_PASSWORD)
    #[arg(long, global = true)]
    email: Option<String>,

    /// Use a pre-issued access token instead of signing in
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline figures, symptom trends, district heat and low-stock alerts
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pharmacy inventory with stock levels
    Inventory {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Symptom trends and reports by district
    Symptoms {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the AI service about recent symptom reports
    Analyze {
        /// Question to ask
        #[arg(value_name = "QUERY")]
        query: Option<String>,
    },

    /// Forecast demand for the tracked medicines
    Predict {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct SymptomsReport<'a> {
    symptom_trends: &'a [SymptomTrendPoint],
    district_heat: &'a [DistrictHeatPoint],
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load(self.config.as_deref()).context("loading configuration")?;
        if let Some(token) = self.token {
            config.access_token = Some(token);
        }
        if let Some(email) = self.email {
            config.email = Some(email);
        }

        let session = resolve_session(&config).await?;

        let store = RestDataStore::new(
            &config.store_url,
            &config.store_anon_key,
            config.request_timeout_secs,
        )?;
        let context =
            DashboardContext::new(DataLoaderService::new(store, config.symptom_log_limit));

        if let RefreshOutcome::Failed(failure) = context.sign_in(session).await {
            return Err(failure.into());
        }
        let snapshot = context.snapshot();
        let data = &snapshot.data;
        let today = chrono::Local::now().date_naive();

        match self.command {
            Commands::Dashboard { json } => {
                let summary =
                    Aggregator::summarize(data, &config.low_stock, config.trend_top_n, today);
                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print!("{}", report::render_dashboard(&summary));
                }
            }
            Commands::Inventory { json } => {
                if json {
                    let view = report::inventory_with_levels(&data.pharmacies, &config.low_stock);
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print!(
                        "{}",
                        report::render_inventory(&data.pharmacies, &config.low_stock)
                    );
                }
            }
            Commands::Symptoms { json } => {
                let trends = Aggregator::symptom_trends(&data.symptom_logs, config.trend_top_n);
                let heat = Aggregator::district_heat(&data.symptom_logs);
                if json {
                    let report = SymptomsReport {
                        symptom_trends: &trends,
                        district_heat: &heat,
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", report::render_trends(&trends));
                    println!();
                    print!("{}", report::render_district_heat(&heat));
                }
            }
            Commands::Analyze { query } => {
                let insights = insight_service(&config)?;
                let query = query.as_deref().unwrap_or(DEFAULT_QUERY);
                println!(
                    "{}",
                    insights.analyze_symptom_data(&data.symptom_logs, query).await
                );
            }
            Commands::Predict { json } => {
                let insights = insight_service(&config)?;
                let predictions = insights
                    .predict_medicine_demand(&data.symptom_logs, &data.pharmacies)
                    .await
                    .map_err(anyhow::Error::msg)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&predictions)?);
                } else {
                    print!("{}", report::render_predictions(&predictions));
                }
            }
        }

        Ok(())
    }
}

/// Pre-issued token wins; otherwise password sign-in
async fn resolve_session(config: &Config) -> crate::types::Result<Session> {
    if let Some(token) = &config.access_token {
        return Ok(Session {
            access_token: token.clone(),
            email: config.email.clone(),
        });
    }

    match (&config.email, &config.password) {
        (Some(email), Some(password)) => {
            let auth = AuthClient::new(
                &config.store_url,
                &config.store_anon_key,
                config.request_timeout_secs,
            )?;
            auth.sign_in_with_password(email, password).await
        }
        _ => Err(PharmwatchError::Auth(
            "no credentials: set PHARMWATCH_ACCESS_TOKEN, or PHARMWATCH_EMAIL and PHARMWATCH_PASSWORD"
                .into(),
        )),
    }
}

fn insight_service(config: &Config) -> crate::types::Result<InsightService<GeminiClient>> {
    let client = GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
        config.request_timeout_secs,
    )?;
    Ok(InsightService::new(
        client,
        config.ai_sample_size,
        config.tracked_medicines.clone(),
        config.forecast_days,
    ))
}
