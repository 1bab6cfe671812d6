use std::env;
use std::path::PathBuf;

use crate::feed::types::MAX_SIZE_DECIMALS;
use crate::services::orchestrator::MaintenanceConfig;
use crate::services::scheduler::SchedulerConfig;
use crate::services::seed_list::SeedList;

const DEFAULT_DATABASE_URL: &str = "sqlite://whalewatch.db";

/// One hundred years.
const MAX_INACTIVE_AFTER_DAYS: u32 = 36_500;
const MAX_STALE_AFTER_HOURS: u32 = 36_500 * 24;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub api_token: Option<String>,

    // Position feed
    pub feed_graphql_url: String,
    pub feed_result_limit: u32,
    pub feed_size_decimals: u32,
    pub feed_min_interval_ms: u64,
    pub feed_timeout_secs: u64,

    // Discovery
    pub seed_wallets_path: Option<PathBuf>,
    pub discovery_batch_size: usize,

    // Scheduling
    pub refresh_interval_secs: u64,
    pub maintenance_interval_secs: u64,
    pub inactive_after_days: u32,
    pub stale_after_hours: u32,
    pub stale_reclassify_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("PORT", 8080)?,
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.trim().is_empty()),

            feed_graphql_url: env::var("FEED_GRAPHQL_URL")
                .map_err(|_| anyhow::anyhow!("FEED_GRAPHQL_URL must be set"))?,
            feed_result_limit: parse_env("FEED_RESULT_LIMIT", 1_000)?,
            feed_size_decimals: parse_env_bounded("FEED_SIZE_DECIMALS", 0, MAX_SIZE_DECIMALS)?,
            feed_min_interval_ms: parse_env("FEED_MIN_INTERVAL_MS", 1_000)?,
            feed_timeout_secs: parse_env("FEED_TIMEOUT_SECS", 15)?,

            seed_wallets_path: env::var("SEED_WALLETS_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            discovery_batch_size: parse_env("DISCOVERY_BATCH_SIZE", 20)?,

            refresh_interval_secs: parse_env("REFRESH_INTERVAL_SECS", 900)?,
            maintenance_interval_secs: parse_env("MAINTENANCE_INTERVAL_SECS", 3_600)?,
            inactive_after_days: parse_env_bounded("INACTIVE_AFTER_DAYS", 30, MAX_INACTIVE_AFTER_DAYS)?,
            stale_after_hours: parse_env_bounded("STALE_AFTER_HOURS", 24, MAX_STALE_AFTER_HOURS)?,
            stale_reclassify_limit: parse_env("STALE_RECLASSIFY_LIMIT", 50)?,
        })
    }

    pub fn seed_list(&self) -> SeedList {
        match &self.seed_wallets_path {
            Some(path) => SeedList::File(path.clone()),
            None => SeedList::Bundled,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval_secs: self.refresh_interval_secs,
            maintenance_interval_secs: self.maintenance_interval_secs,
            maintenance: MaintenanceConfig {
                inactive_after_days: self.inactive_after_days,
                stale_after_hours: self.stale_after_hours,
                stale_limit: self.stale_reclassify_limit,
            },
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or blank.
fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ({raw:?}): {e}")),
        _ => Ok(default),
    }
}

/// [`parse_env`] with an inclusive upper bound.
fn parse_env_bounded<T>(key: &str, default: T, max: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_env(key, default)?;
    if value > max {
        anyhow::bail!("{key} is out of range ({value}); maximum is {max}");
    }
    Ok(value)
}
