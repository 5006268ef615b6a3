use crate::domain::TimeUs;
use std::collections::HashMap;
use thiserror::Error;

/// Widest report time bucket: one full day.
pub const MAX_TIME_BUCKET_SECS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_files: Vec<String>,
    pub fee_tables: Option<FeeTablePaths>,
    pub crossing_opp: bool,
    pub report_mode: ReportMode,
    pub time_bucket_secs: i64,
    pub end_of_session: TimeUs,
    pub malformed_policy: MalformedPolicy,
    pub top_symbols: usize,
}

/// Locations of the three fee tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTablePaths {
    pub brokerage: String,
    pub global: String,
    pub exchanges: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Detailed,
    Table,
    Json,
}

/// What to do with a log record that cannot be turned into an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Warn, record the skip in the report, and keep going.
    #[default]
    Skip,
    /// Fail ingestion on the first malformed record.
    Abort,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_files: Vec::new(),
            fee_tables: None,
            crossing_opp: false,
            report_mode: ReportMode::Detailed,
            time_bucket_secs: 600,
            end_of_session: TimeUs::from_secs(16 * 3600),
            malformed_policy: MalformedPolicy::Skip,
            top_symbols: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let log_files = env_map
            .get("COST_LOG_FILES")
            .map(|s| {
                s.split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let fee_tables = parse_fee_tables_from_map(&env_map)?;

        let crossing_opp = match env_map
            .get("CROSSING_OPP")
            .map(|s| s.as_str())
            .unwrap_or("false")
        {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CROSSING_OPP".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let report_mode = match env_map
            .get("REPORT_MODE")
            .map(|s| s.as_str())
            .unwrap_or("detailed")
        {
            "detailed" => ReportMode::Detailed,
            "table" => ReportMode::Table,
            "json" => ReportMode::Json,
            other => {
                return Err(ConfigError::InvalidValue(
                    "REPORT_MODE".to_string(),
                    format!("must be detailed, table, or json, got {}", other),
                ))
            }
        };

        let time_bucket_secs = match env_map.get("TIME_BUCKET_SECS") {
            Some(s) => s
                .parse::<i64>()
                .ok()
                .filter(|v| (1..=MAX_TIME_BUCKET_SECS).contains(v))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "TIME_BUCKET_SECS".to_string(),
                        format!("must be an integer in 1..={}", MAX_TIME_BUCKET_SECS),
                    )
                })?,
            None => defaults.time_bucket_secs,
        };

        let end_of_session = match env_map.get("END_OF_SESSION") {
            Some(s) => parse_session_time(s).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "END_OF_SESSION".to_string(),
                    "must be HH:MM:SS".to_string(),
                )
            })?,
            None => defaults.end_of_session,
        };

        let malformed_policy = match env_map
            .get("MALFORMED_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("skip")
        {
            "skip" => MalformedPolicy::Skip,
            "abort" => MalformedPolicy::Abort,
            other => {
                return Err(ConfigError::InvalidValue(
                    "MALFORMED_POLICY".to_string(),
                    format!("must be skip or abort, got {}", other),
                ))
            }
        };

        let top_symbols = env_map
            .get("TOP_SYMBOLS")
            .map(|s| s.as_str())
            .unwrap_or("20")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TOP_SYMBOLS".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;

        Ok(Config {
            log_files,
            fee_tables,
            crossing_opp,
            report_mode,
            time_bucket_secs,
            end_of_session,
            malformed_policy,
            top_symbols,
        })
    }
}

/// The fee tables come as a set: all three paths or none.
fn parse_fee_tables_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Option<FeeTablePaths>, ConfigError> {
    const KEYS: [&str; 3] = ["FEE_TABLE_PATH", "GLOBAL_FEES_PATH", "EXCHANGES_PATH"];

    let present: Vec<Option<&String>> = KEYS.iter().map(|k| env_map.get(*k)).collect();
    if present.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let Some(missing) = KEYS
        .iter()
        .zip(present.iter())
        .find_map(|(k, v)| v.is_none().then_some(*k))
    {
        return Err(ConfigError::MissingEnv(missing.to_string()));
    }

    Ok(Some(FeeTablePaths {
        brokerage: env_map["FEE_TABLE_PATH"].clone(),
        global: env_map["GLOBAL_FEES_PATH"].clone(),
        exchanges: env_map["EXCHANGES_PATH"].clone(),
    }))
}

fn parse_session_time(s: &str) -> Option<TimeUs> {
    let t = chrono::NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").ok()?;
    Some(TimeUs::from_secs(
        chrono::Timelike::num_seconds_from_midnight(&t) as i64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert!(config.log_files.is_empty());
        assert!(config.fee_tables.is_none());
        assert!(!config.crossing_opp);
        assert_eq!(config.report_mode, ReportMode::Detailed);
        assert_eq!(config.time_bucket_secs, 600);
        assert_eq!(config.end_of_session, TimeUs::from_secs(57_600));
        assert_eq!(config.malformed_policy, MalformedPolicy::Skip);
        assert_eq!(config.top_symbols, 20);
    }

    #[test]
    fn test_log_files_list() {
        let mut env_map = HashMap::new();
        env_map.insert(
            "COST_LOG_FILES".to_string(),
            "a.log, b.log.lz4,,".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.log_files, vec!["a.log", "b.log.lz4"]);
    }

    #[test]
    fn test_partial_fee_tables_rejected() {
        let mut env_map = HashMap::new();
        env_map.insert("FEE_TABLE_PATH".to_string(), "/tmp/fees".to_string());
        env_map.insert("EXCHANGES_PATH".to_string(), "/tmp/ex".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "GLOBAL_FEES_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_full_fee_tables() {
        let mut env_map = HashMap::new();
        env_map.insert("FEE_TABLE_PATH".to_string(), "/tmp/fees".to_string());
        env_map.insert("GLOBAL_FEES_PATH".to_string(), "/tmp/global".to_string());
        env_map.insert("EXCHANGES_PATH".to_string(), "/tmp/ex".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        let tables = config.fee_tables.unwrap();
        assert_eq!(tables.global, "/tmp/global");
    }

    #[test]
    fn test_invalid_crossing_opp() {
        let mut env_map = HashMap::new();
        env_map.insert("CROSSING_OPP".to_string(), "maybe".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CROSSING_OPP"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_report_mode() {
        let mut env_map = HashMap::new();
        env_map.insert("REPORT_MODE".to_string(), "html".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "REPORT_MODE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_time_bucket_rejected() {
        let mut env_map = HashMap::new();
        env_map.insert("TIME_BUCKET_SECS".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "TIME_BUCKET_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_time_bucket_upper_bound() {
        for value in ["86401", "10000000000000"] {
            let mut env_map = HashMap::new();
            env_map.insert("TIME_BUCKET_SECS".to_string(), value.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "TIME_BUCKET_SECS"),
                _ => panic!("Expected InvalidValue error for {}", value),
            }
        }

        let mut env_map = HashMap::new();
        env_map.insert("TIME_BUCKET_SECS".to_string(), "86400".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.time_bucket_secs, MAX_TIME_BUCKET_SECS);
    }

    #[test]
    fn test_end_of_session_and_policy() {
        let mut env_map = HashMap::new();
        env_map.insert("END_OF_SESSION".to_string(), "13:00:00".to_string());
        env_map.insert("MALFORMED_POLICY".to_string(), "abort".to_string());
        env_map.insert("CROSSING_OPP".to_string(), "true".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.end_of_session, TimeUs::from_secs(13 * 3600));
        assert_eq!(config.malformed_policy, MalformedPolicy::Abort);
        assert!(config.crossing_opp);
    }

    #[test]
    fn test_invalid_end_of_session() {
        let mut env_map = HashMap::new();
        env_map.insert("END_OF_SESSION".to_string(), "4pm".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "END_OF_SESSION"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
