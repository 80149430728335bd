use crate::analysis::ReportMode;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tradebook_dir: PathBuf,
    pub holdings_file: String,
    pub aliases_file: Option<PathBuf>,
    pub prices_file: Option<PathBuf>,
    pub run_mode: RunMode,
    pub target_symbol: Option<String>,
    pub valuation_date: NaiveDate,
    pub port: u16,
    pub request_timeout: Duration,
}

/// What `runner::run` does with the loaded ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Xirr,
    TradeHistory,
    Serve,
}

impl RunMode {
    /// The report to print, or `None` when serving HTTP.
    pub fn report_mode(&self) -> Option<ReportMode> {
        match self {
            RunMode::Xirr => Some(ReportMode::Xirr),
            RunMode::TradeHistory => Some(ReportMode::TradeHistory),
            RunMode::Serve => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let tradebook_dir = env_map
            .get("TRADEBOOK_DIR")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("TRADEBOOK_DIR".to_string()))?;

        let holdings_file = env_map
            .get("HOLDINGS_FILE")
            .cloned()
            .unwrap_or_else(|| "holdings.csv".to_string());

        let aliases_file = non_empty(&env_map, "ALIASES_FILE").map(PathBuf::from);
        let prices_file = non_empty(&env_map, "PRICES_FILE").map(PathBuf::from);

        let run_mode = match env_map
            .get("REPORT_MODE")
            .map(|s| s.as_str())
            .unwrap_or("xirr")
        {
            "xirr" => RunMode::Xirr,
            "trade_history" => RunMode::TradeHistory,
            "serve" => RunMode::Serve,
            other => {
                return Err(ConfigError::InvalidValue(
                    "REPORT_MODE".to_string(),
                    format!("must be xirr, trade_history, or serve, got {}", other),
                ))
            }
        };

        let target_symbol = non_empty(&env_map, "TARGET_SYMBOL").map(str::to_string);
        if run_mode == RunMode::TradeHistory && target_symbol.is_none() {
            return Err(ConfigError::MissingEnv("TARGET_SYMBOL".to_string()));
        }

        let valuation_date = match non_empty(&env_map, "VALUATION_DATE") {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                ConfigError::InvalidValue(
                    "VALUATION_DATE".to_string(),
                    "must be YYYY-MM-DD".to_string(),
                )
            })?,
            None => chrono::Local::now().date_naive(),
        };

        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let request_timeout_ms = env_map
            .get("REQUEST_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("10000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            tradebook_dir,
            holdings_file,
            aliases_file,
            prices_file,
            run_mode,
            target_symbol,
            valuation_date,
            port,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
