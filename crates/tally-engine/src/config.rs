//! # Engine Configuration
//!
//! Settings for the sales engine, loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DATABASE_PATH=/var/lib/tally/tally.db                        │
//! │     TALLY_DEFAULT_COUNTRY=NG                                           │
//! │     TALLY_ACCOUNTING_ENABLED=false                                     │
//! │     TALLY_ACCOUNTING_DISPATCH=background                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/engine.toml (Linux)                                │
//! │     ~/Library/Application Support/com.tally.tally/engine.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "tally.db"
//! max_connections = 5
//!
//! [business]
//! default_country = "NG"
//!
//! [accounting]
//! enabled = true
//! dispatch = "inline"   # inline | background
//!
//! [accounting.accounts]
//! cash = "1000"
//! receivable = "1100"
//! goods_revenue = "4000"
//! services_revenue = "4100"
//!
//! [[tax.rules]]
//! jurisdiction = "NG"
//! category = "STANDARD_GOODS"
//! effective_from = "2020-02-01"
//! rate_bps = 750
//! tax_code = "VAT"
//! tax_type_id = "vat"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tally_core::validation::{validate_category_code, validate_jurisdiction, validate_tax_rate_bps};
use tally_core::tax::{SERVICES, STANDARD_GOODS};
use tally_core::{CustomerClass, ENGINE_VERSION};
use tally_db::DbConfig;

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Dispatch Mode
// =============================================================================

/// How the accounting bridge runs after a sale commits.
///
/// Neither mode retries a failed posting; failures stay on the sale for
/// reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Awaited before the sale call returns; the outcome is reported.
    #[default]
    Inline,

    /// Spawned onto the runtime; the caller sees `Queued`.
    Background,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Inline => write!(f, "inline"),
            DispatchMode::Background => write!(f, "background"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" | "sync" => Ok(DispatchMode::Inline),
            "background" | "async" | "deferred" => Ok(DispatchMode::Background),
            other => Err(ConfigError::Invalid(format!(
                "Unknown accounting dispatch mode: '{}'. Valid options: inline, background",
                other
            ))),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tally.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Business Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    /// Tax jurisdiction used when neither the request nor the business
    /// names one.
    #[serde(default = "default_country")]
    pub default_country: String,
}

fn default_country() -> String {
    "NG".to_string()
}

impl Default for BusinessSettings {
    fn default() -> Self {
        BusinessSettings {
            default_country: default_country(),
        }
    }
}

// =============================================================================
// Accounting Settings
// =============================================================================

/// Ledger account codes the bridge posts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCodes {
    #[serde(default = "default_cash_account")]
    pub cash: String,

    #[serde(default = "default_receivable_account")]
    pub receivable: String,

    #[serde(default = "default_goods_revenue_account")]
    pub goods_revenue: String,

    /// Used when any line of the sale is a service.
    #[serde(default = "default_services_revenue_account")]
    pub services_revenue: String,
}

fn default_cash_account() -> String {
    "1000".to_string()
}

fn default_receivable_account() -> String {
    "1100".to_string()
}

fn default_goods_revenue_account() -> String {
    "4000".to_string()
}

fn default_services_revenue_account() -> String {
    "4100".to_string()
}

impl Default for AccountCodes {
    fn default() -> Self {
        AccountCodes {
            cash: default_cash_account(),
            receivable: default_receivable_account(),
            goods_revenue: default_goods_revenue_account(),
            services_revenue: default_services_revenue_account(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub dispatch: DispatchMode,

    #[serde(default)]
    pub accounts: AccountCodes,
}

fn default_true() -> bool {
    true
}

impl Default for AccountingSettings {
    fn default() -> Self {
        AccountingSettings {
            enabled: true,
            dispatch: DispatchMode::default(),
            accounts: AccountCodes::default(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

/// One effective-dated rate.
///
/// A rule applies on dates in `effective_from..=effective_to`. A rule with a
/// `customer_class` beats a class-less rule for the same category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRule {
    pub jurisdiction: String,
    pub category: String,
    #[serde(default)]
    pub customer_class: Option<CustomerClass>,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    pub rate_bps: u32,
    pub tax_code: String,
    #[serde(default)]
    pub tax_type_id: Option<String>,
    /// Identifier written to tax-audit rows; generated from the other
    /// fields when absent.
    #[serde(default)]
    pub rate_id: Option<String>,
}

impl RateRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Label stored in every tax-audit context.
    #[serde(default = "default_engine_version")]
    pub engine_version: String,

    #[serde(default = "default_rules")]
    pub rules: Vec<RateRule>,
}

fn default_engine_version() -> String {
    ENGINE_VERSION.to_string()
}

fn default_rules() -> Vec<RateRule> {
    let vat_from = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap_or(NaiveDate::MIN);
    [STANDARD_GOODS, SERVICES]
        .into_iter()
        .map(|category| RateRule {
            jurisdiction: "NG".to_string(),
            category: category.to_string(),
            customer_class: None,
            effective_from: vat_from,
            effective_to: None,
            rate_bps: 750,
            tax_code: "VAT".to_string(),
            tax_type_id: Some("vat".to_string()),
            rate_id: None,
        })
        .collect()
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            engine_version: default_engine_version(),
            rules: default_rules(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub business: BusinessSettings,

    #[serde(default)]
    pub accounting: AccountingSettings,

    #[serde(default)]
    pub tax: TaxSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Override with TOML file (if exists)
    /// 3. Override with environment variables
    /// 4. Validate final configuration
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_jurisdiction(&self.business.default_country).map_err(|e| {
            ConfigError::Invalid(format!("business.default_country: {}", e))
        })?;

        let accounts = &self.accounting.accounts;
        for (name, code) in [
            ("cash", &accounts.cash),
            ("receivable", &accounts.receivable),
            ("goods_revenue", &accounts.goods_revenue),
            ("services_revenue", &accounts.services_revenue),
        ] {
            if code.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "accounting.accounts.{} must not be empty",
                    name
                )));
            }
        }

        if accounts.cash == accounts.goods_revenue || accounts.cash == accounts.services_revenue {
            return Err(ConfigError::Invalid(
                "the cash account cannot also be a revenue account".into(),
            ));
        }

        for (index, rule) in self.tax.rules.iter().enumerate() {
            let invalid = |msg: String| ConfigError::Invalid(format!("tax.rules[{}]: {}", index, msg));

            validate_jurisdiction(&rule.jurisdiction).map_err(|e| invalid(e.to_string()))?;
            validate_category_code(&rule.category).map_err(|e| invalid(e.to_string()))?;
            validate_tax_rate_bps(rule.rate_bps).map_err(|e| invalid(e.to_string()))?;

            if rule.tax_code.trim().is_empty() {
                return Err(invalid("tax_code must not be empty".into()));
            }

            if let Some(end) = rule.effective_to {
                if end < rule.effective_from {
                    return Err(invalid("effective_to is before effective_from".into()));
                }
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(country) = lookup("TALLY_DEFAULT_COUNTRY") {
            self.business.default_country = country.trim().to_uppercase();
        }

        if let Some(enabled) = lookup("TALLY_ACCOUNTING_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.accounting.enabled = true,
                "0" | "false" | "no" | "off" => self.accounting.enabled = false,
                _ => warn!(value = %enabled, "Unknown TALLY_ACCOUNTING_ENABLED value"),
            }
        }

        if let Some(mode) = lookup("TALLY_ACCOUNTING_DISPATCH") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding accounting dispatch from environment");
                    self.accounting.dispatch = parsed;
                }
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    /// Storage settings in the form `Database::new` takes.
    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
