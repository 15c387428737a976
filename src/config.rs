use crate::catalog::DEFAULT_CALORIE_RATE;
use std::{env, path::PathBuf, str::FromStr};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STATS_PERIOD_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Window used by the dashboard summary when a request does not name one.
    pub stats_period_days: u32,
    /// kcal per minute for exercises missing from the catalog.
    pub default_calorie_rate: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT", DEFAULT_PORT),
            data_dir: env::var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            stats_period_days: parse_var("STATS_PERIOD_DAYS", DEFAULT_STATS_PERIOD_DAYS),
            default_calorie_rate: parse_var("DEFAULT_CALORIE_RATE", DEFAULT_CALORIE_RATE),
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            stats_period_days: DEFAULT_STATS_PERIOD_DAYS,
            default_calorie_rate: DEFAULT_CALORIE_RATE,
        }
    }
}

fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {name}={value:?}");
            default
        }),
        Err(_) => default,
    }
}
