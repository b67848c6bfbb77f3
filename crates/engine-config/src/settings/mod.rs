use crate::error::SettingsError;
use connectors::adapter::redact;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr, time::Duration};

pub mod env;

pub use env::EnvManager;

pub const SOURCE_DATABASE_URL: &str = "SOURCE_DATABASE_URL";
pub const TARGET_DATABASE_URL: &str = "TARGET_DATABASE_URL";
pub const MANAGER_CALLBACK_URL: &str = "MANAGER_CALLBACK_URL";
pub const MODULE_ID: &str = "MODULE_ID";
pub const MODULE_VERSION: &str = "MODULE_VERSION";
pub const SYNC_BATCH_SIZE: &str = "SYNC_BATCH_SIZE";
pub const SYNC_MAX_CONCURRENT_RUNS: &str = "SYNC_MAX_CONCURRENT_RUNS";
pub const SYNC_UPSERT_STRATEGY: &str = "SYNC_UPSERT_STRATEGY";
pub const REPORT_TIMEOUT_MS: &str = "REPORT_TIMEOUT_MS";

pub const DEFAULT_MODULE_ID: &str = "tablesync";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 3;
pub const DEFAULT_REPORT_TIMEOUT_MS: u64 = 5000;

/// How a row reaches the target table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertStrategy {
    /// Existence check, then UPDATE or INSERT: two statements per row.
    #[default]
    ExistsCheck,
    /// One INSERT with the dialect's conflict clause. Needs a unique
    /// constraint on the target key.
    Native,
}

impl UpsertStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertStrategy::ExistsCheck => "exists-check",
            UpsertStrategy::Native => "native",
        }
    }
}

impl fmt::Display for UpsertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exists-check" | "exists_check" => Ok(UpsertStrategy::ExistsCheck),
            "native" => Ok(UpsertStrategy::Native),
            other => Err(format!(
                "unknown upsert strategy '{other}' (expected exists-check or native)"
            )),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct Settings {
    pub source_url: Option<String>,
    pub target_url: Option<String>,
    pub callback_url: Option<String>,
    pub module_id: String,
    pub module_version: String,
    pub batch_size: usize,
    pub max_concurrent_runs: usize,
    pub upsert_strategy: UpsertStrategy,
    pub report_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_url: None,
            target_url: None,
            callback_url: None,
            module_id: DEFAULT_MODULE_ID.to_string(),
            module_version: env!("CARGO_PKG_VERSION").to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            upsert_strategy: UpsertStrategy::default(),
            report_timeout: Duration::from_millis(DEFAULT_REPORT_TIMEOUT_MS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_env_manager(&EnvManager::new())
    }

    /// Process environment overlaid with the given `.env` file.
    pub fn from_env_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let mut env = EnvManager::new();
        env.load_from_file(path)?;
        Self::from_env_manager(&env)
    }

    pub fn from_env_manager(env: &EnvManager) -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        Ok(Settings {
            source_url: env.get(SOURCE_DATABASE_URL).map(str::to_string),
            target_url: env.get(TARGET_DATABASE_URL).map(str::to_string),
            callback_url: env.get(MANAGER_CALLBACK_URL).map(str::to_string),
            module_id: env
                .get(MODULE_ID)
                .map(str::to_string)
                .unwrap_or(defaults.module_id),
            module_version: env
                .get(MODULE_VERSION)
                .map(str::to_string)
                .unwrap_or(defaults.module_version),
            batch_size: positive(env, SYNC_BATCH_SIZE)?.unwrap_or(defaults.batch_size),
            max_concurrent_runs: positive(env, SYNC_MAX_CONCURRENT_RUNS)?
                .unwrap_or(defaults.max_concurrent_runs),
            upsert_strategy: match env.get(SYNC_UPSERT_STRATEGY) {
                Some(raw) => raw.parse().map_err(|reason| SettingsError::Invalid {
                    key: SYNC_UPSERT_STRATEGY,
                    reason,
                })?,
                None => defaults.upsert_strategy,
            },
            report_timeout: positive(env, REPORT_TIMEOUT_MS)?
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.report_timeout),
        })
    }

    pub fn source_url(&self) -> Result<&str, SettingsError> {
        self.source_url
            .as_deref()
            .ok_or(SettingsError::Missing(SOURCE_DATABASE_URL))
    }

    pub fn target_url(&self) -> Result<&str, SettingsError> {
        self.target_url
            .as_deref()
            .ok_or(SettingsError::Missing(TARGET_DATABASE_URL))
    }

    /// The manager base URL for one run: the request's override when
    /// given, else the configured one.
    pub fn callback_url_for<'a>(
        &'a self,
        request_override: Option<&'a str>,
    ) -> Result<&'a str, SettingsError> {
        request_override
            .or(self.callback_url.as_deref())
            .ok_or(SettingsError::Missing(MANAGER_CALLBACK_URL))
    }
}

fn positive(env: &EnvManager, key: &'static str) -> Result<Option<usize>, SettingsError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(0) => Err(SettingsError::Invalid {
            key,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(SettingsError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("source_url", &self.source_url.as_deref().map(redact))
            .field("target_url", &self.target_url.as_deref().map(redact))
            .field("callback_url", &self.callback_url)
            .field("module_id", &self.module_id)
            .field("module_version", &self.module_version)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_runs", &self.max_concurrent_runs)
            .field("upsert_strategy", &self.upsert_strategy)
            .field("report_timeout", &self.report_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let settings =
            Settings::from_env_manager(&EnvManager::from_vars(Vec::<(String, String)>::new()))
                .unwrap();
        assert_eq!(settings.module_id, "tablesync");
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.max_concurrent_runs, 3);
        assert_eq!(settings.upsert_strategy, UpsertStrategy::ExistsCheck);
        assert_eq!(settings.report_timeout, Duration::from_millis(5000));
        assert!(matches!(
            settings.source_url(),
            Err(SettingsError::Missing(SOURCE_DATABASE_URL))
        ));
    }

    #[test]
    fn reads_every_variable() {
        let env = EnvManager::from_vars([
            (SOURCE_DATABASE_URL, "mysql://root:pw@src/db"),
            (TARGET_DATABASE_URL, "postgres://u:pw@dst/db"),
            (MANAGER_CALLBACK_URL, "http://manager/api"),
            (MODULE_ID, "db-sync"),
            (MODULE_VERSION, "2.0.0"),
            (SYNC_BATCH_SIZE, "500"),
            (SYNC_MAX_CONCURRENT_RUNS, "1"),
            (SYNC_UPSERT_STRATEGY, "native"),
            (REPORT_TIMEOUT_MS, "250"),
        ]);
        let settings = Settings::from_env_manager(&env).unwrap();

        assert_eq!(settings.source_url().unwrap(), "mysql://root:pw@src/db");
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.upsert_strategy, UpsertStrategy::Native);
        assert_eq!(settings.report_timeout, Duration::from_millis(250));
        assert!(!format!("{settings:?}").contains("pw"));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        let zero = EnvManager::from_vars([(SYNC_BATCH_SIZE, "0")]);
        assert!(matches!(
            Settings::from_env_manager(&zero),
            Err(SettingsError::Invalid { key: SYNC_BATCH_SIZE, .. })
        ));

        let strategy = EnvManager::from_vars([(SYNC_UPSERT_STRATEGY, "merge")]);
        assert!(Settings::from_env_manager(&strategy).is_err());
    }

    #[test]
    fn request_callback_overrides_configured_one() {
        let settings = Settings {
            callback_url: Some("http://configured".into()),
            ..Settings::default()
        };
        assert_eq!(settings.callback_url_for(Some("http://request")).unwrap(), "http://request");
        assert_eq!(settings.callback_url_for(None).unwrap(), "http://configured");
        assert!(Settings::default().callback_url_for(None).is_err());
    }
}
