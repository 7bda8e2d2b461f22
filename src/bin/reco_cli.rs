// Recommendation CLI
//
// Purpose: Run one or more farm requests through the engine and print the
// recommendations as JSON.
// Usage: cargo run --features cli --bin reco_cli
//
// Environment:
//   RECO_CONFIG     engine config JSON (defaults built in)
//   RECO_VARIETIES  variety database JSON (built-in 147 varieties)
//   RECO_REQUEST    farm request JSON, a single object or an array
//   RECO_FIXTURE    source fixture JSON keyed by source kind
// Without RECO_REQUEST and RECO_FIXTURE the Wayanad demonstration farm runs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use reco_engine_rust::cascade::BaselineTable;
use reco_engine_rust::{
    CancellationToken, Coordinate, EngineConfig, FarmRequest, FixtureFetcher, RecommendationEngine,
    VarietyDatabase, ZoneTable,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn load_requests(path: &PathBuf) -> Result<Vec<FarmRequest>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| "Failed to parse request JSON")?;
    if value.is_array() {
        serde_json::from_value(value).with_context(|| "Invalid farm request list")
    } else {
        Ok(vec![serde_json::from_value(value).with_context(|| "Invalid farm request")?])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reco_engine_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match env_path("RECO_CONFIG") {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };

    let zones = Arc::new(ZoneTable::builtin());
    let varieties = match env_path("RECO_VARIETIES") {
        Some(path) => VarietyDatabase::load(&path, &zones)?,
        None => VarietyDatabase::builtin(&zones)?,
    };
    let baseline = Arc::new(BaselineTable::from_zones(&zones));

    let as_of = Utc::now();
    let fetcher = match env_path("RECO_FIXTURE") {
        Some(path) => FixtureFetcher::load(&path)?,
        None => FixtureFetcher::wayanad_demo(as_of),
    };
    let requests = match env_path("RECO_REQUEST") {
        Some(path) => load_requests(&path)?,
        None => {
            let mut request = FarmRequest::new("wayanad-demo", Coordinate::new(11.546179, 76.41653));
            request.as_of = Some(as_of);
            vec![request]
        }
    };

    tracing::info!("Configuration:");
    tracing::info!("  RECO_CONFIG: {:?}", env_path("RECO_CONFIG"));
    tracing::info!("  RECO_VARIETIES: {:?}", env_path("RECO_VARIETIES"));
    tracing::info!("  RECO_FIXTURE: {:?}", env_path("RECO_FIXTURE"));
    tracing::info!("  Requests: {}", requests.len());

    let engine = RecommendationEngine::new(config, zones, Arc::new(varieties), baseline, Arc::new(fetcher))?;
    let cancel = CancellationToken::new();
    let outcomes = engine.recommend_many(&requests, &cancel).await;

    let mut failures = 0;
    let mut output = Vec::with_capacity(outcomes.len());
    for (request, outcome) in requests.iter().zip(outcomes) {
        match outcome {
            Ok(recommendation) => output.push(serde_json::to_value(&recommendation)?),
            Err(e) => {
                failures += 1;
                tracing::error!("Farm {} failed: {}", request.farm_id, e);
                output.push(serde_json::json!({
                    "farm_id": request.farm_id,
                    "error": e.to_string(),
                }));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    tracing::info!("Done: {} succeeded, {} failed", output.len() - failures, failures);
    Ok(())
}
