//! Configuration for aggregator_rust

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::env;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    // Cycle
    pub cycle_interval_secs: u64,
    pub sanity_bound_millions: f64,

    // Persistence
    pub snapshot_dir: String,
    pub baseline_anchor_date: Option<NaiveDate>,

    // HTTP
    pub http_timeout_secs: u64,
    pub user_agent: String,

    // Feeds
    pub enable_vendor_fallback: bool,
}

impl AggregatorConfig {
    pub fn from_env() -> Result<Self> {
        let cycle_interval_secs = parse_u64("GOLD_CYCLE_INTERVAL_SECS", 60)?;
        let sanity_bound_millions = parse_f64("GOLD_SANITY_BOUND_MILLIONS", 50.0)?;
        let http_timeout_secs = parse_u64("GOLD_HTTP_TIMEOUT_SECS", 10)?;

        if cycle_interval_secs == 0 {
            return Err(anyhow!("GOLD_CYCLE_INTERVAL_SECS must be > 0"));
        }
        if sanity_bound_millions <= 0.0 {
            return Err(anyhow!("GOLD_SANITY_BOUND_MILLIONS must be > 0"));
        }
        if http_timeout_secs == 0 {
            return Err(anyhow!("GOLD_HTTP_TIMEOUT_SECS must be > 0"));
        }

        let baseline_anchor_date = match env::var("GOLD_ANCHOR_DATE") {
            Ok(val) if val.trim().is_empty() => None,
            Ok(val) => Some(
                NaiveDate::parse_from_str(val.trim(), "%Y-%m-%d")
                    .map_err(|_| anyhow!("GOLD_ANCHOR_DATE must be YYYY-MM-DD"))?,
            ),
            Err(_) => Some(NaiveDate::from_ymd_opt(2025, 10, 7).expect("valid anchor default")),
        };

        Ok(Self {
            cycle_interval_secs,
            sanity_bound_millions,

            snapshot_dir: env::var("GOLD_SNAPSHOT_DIR")
                .unwrap_or_else(|_| "data/snapshots".to_string()),
            baseline_anchor_date,

            http_timeout_secs,
            user_agent: env::var("GOLD_USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (compatible; goldboard-aggregator/0.1)".to_string()
            }),

            enable_vendor_fallback: env::var("GOLD_ENABLE_VENDOR_FALLBACK")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()?,
        })
    }
}

/// Parse environment variable as f64 with default fallback
fn parse_f64(var_name: &str, default: f64) -> Result<f64> {
    match env::var(var_name) {
        Ok(val) => val
            .parse()
            .map_err(|_| anyhow!("{} must be a valid f64", var_name)),
        Err(_) => Ok(default),
    }
}

/// Parse environment variable as u64 with default fallback
fn parse_u64(var_name: &str, default: u64) -> Result<u64> {
    match env::var(var_name) {
        Ok(val) => val
            .parse()
            .map_err(|_| anyhow!("{} must be a valid u64", var_name)),
        Err(_) => Ok(default),
    }
}
