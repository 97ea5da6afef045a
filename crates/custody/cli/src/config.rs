//! Configuration for the custody CLI

use custody_types::{ExecutionSettings, OwnerId, WalletConfig};
use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Owner set and quorum used by `init`
    #[serde(default)]
    pub wallet: WalletSection,

    /// Execution policy and proposal lifetime used by `init`
    #[serde(default)]
    pub execution: ExecutionSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wallet section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletSection {
    /// Owner identifiers
    #[serde(default)]
    pub owners: Vec<String>,

    /// Confirmations required to execute
    #[serde(default)]
    pub quorum: u32,
}

impl WalletSection {
    pub fn to_wallet_config(&self) -> WalletConfig {
        WalletConfig::new(
            self.owners.iter().map(|o| OwnerId::new(o.trim())).collect(),
            self.quorum,
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl CustodyConfig {
    /// Load configuration: built-in defaults, then the file at `path` if
    /// given, then `CUSTODY_*` environment variables.
    ///
    /// Environment keys use `__` between sections, e.g.
    /// `CUSTODY_WALLET__QUORUM=2`, `CUSTODY_WALLET__OWNERS=alice,bob,carol`,
    /// `CUSTODY_EXECUTION__PROPOSAL_TTL_SECS=3600`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&CustodyConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // Add environment variables with CUSTODY_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CUSTODY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("wallet.owners")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::ExecutionPolicy;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CustodyConfig::default();
        assert!(config.wallet.owners.is_empty());
        assert_eq!(config.execution.policy, ExecutionPolicy::AutoOnQuorum);
        assert_eq!(config.execution.proposal_ttl_secs, None);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[wallet]
owners = ["alice", "bob", "carol"]
quorum = 2

[execution]
policy = "explicit"
proposal_ttl_secs = 600

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = CustodyConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.wallet.owners, vec!["alice", "bob", "carol"]);
        assert_eq!(config.wallet.quorum, 2);
        assert_eq!(config.execution.policy, ExecutionPolicy::Explicit);
        assert_eq!(config.execution.proposal_ttl_secs, Some(600));
        assert_eq!(config.logging.level, "debug");

        let wallet = config.wallet.to_wallet_config();
        assert!(wallet.validate().is_ok());
        assert_eq!(wallet.owners[1], OwnerId::new("bob"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(CustodyConfig::load(Some("/nonexistent/custody.toml")).is_err());
    }
}
