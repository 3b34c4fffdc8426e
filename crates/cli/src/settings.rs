//! Settings for `walletctl`.
//!
//! Values come from an optional `settings.toml`, then `WALLETCTL_*`
//! environment variables (nested keys use `__`, e.g. `WALLETCTL_APP__LEVEL`).
use config::{Config, ConfigError, Environment, File};
use ledger::ReconcilePolicies;
use serde::Deserialize;

const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite(String::from("./wallets.db"))
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub reconcile: ReconcilePolicies,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_SETTINGS_PATH)).required(false))
            .add_source(Environment::with_prefix("WALLETCTL").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use ledger::ReconcilePolicy;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./wallets.db?mode=rwc");
        assert_eq!(settings.reconcile, ReconcilePolicies::default());
    }

    #[test]
    fn reads_database_and_policies() {
        let settings = parse(
            r#"
            database = "memory"

            [app]
            level = "debug"

            [reconcile]
            income_records = "append_only"
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database.url(), "sqlite::memory:");
        assert_eq!(settings.reconcile.income_records, ReconcilePolicy::AppendOnly);
        assert_eq!(settings.reconcile.expense_records, ReconcilePolicy::ReplaceAll);
    }

    #[test]
    fn reads_sqlite_path() {
        let settings = parse(r#"database = { sqlite = "/tmp/w.db" }"#);
        assert_eq!(settings.database.url(), "sqlite:/tmp/w.db?mode=rwc");
    }
}
