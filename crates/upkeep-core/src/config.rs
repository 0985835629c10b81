use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3565;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_REMINDER_CRON: &str = "0 8 * * *";
pub const DEFAULT_EMAIL_BASE_URL: &str = "https://api.brevo.com";

/// Top-level config (upkeep.toml + UPKEEP_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpkeepConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Transactional email (Brevo) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Brevo API key. When unset the notifier is disabled and every send fails.
    pub api_key: Option<String>,
    #[serde(default = "default_email_base_url")]
    pub base_url: String,
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Recipient used by the timer path. The manual trigger supplies its own.
    pub recipient: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_email_base_url(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            recipient: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Cron expression, 5 fields (`min hour dom mon dow`) or 6/7 with seconds.
    #[serde(default = "default_cron")]
    pub cron: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    pub token: Option<String>,
}

/// How mutating HTTP endpoints are protected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Static bearer token in the Authorization header.
    Token,
    /// No authentication. Trusted networks only.
    #[default]
    None,
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_cron() -> String {
    DEFAULT_REMINDER_CRON.to_string()
}
fn default_email_base_url() -> String {
    DEFAULT_EMAIL_BASE_URL.to_string()
}
fn default_sender_email() -> String {
    "noreply@example.com".to_string()
}
fn default_sender_name() -> String {
    "Maintenance Reminder".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.upkeep/upkeep.db", home)
}

impl UpkeepConfig {
    /// Load config from a TOML file with UPKEEP_* env var overrides.
    ///
    /// Nested keys use a double underscore: `UPKEEP_EMAIL__API_KEY`.
    /// A missing file is not an error; every section has defaults. A file
    /// that exists but does not parse, or holds a value of the wrong type,
    /// is reported as [`CoreError::Config`].
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(%path, "loading configuration");
        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("UPKEEP_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.upkeep/upkeep.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_usable_without_a_file() {
        let config = UpkeepConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.reminders.cron, "0 8 * * *");
        assert!(config.reminders.enabled);
        assert_eq!(config.auth.mode, AuthMode::None);
        assert!(config.email.api_key.is_none());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config: UpkeepConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [gateway]
                port = 9000

                [email]
                api_key = "xkeysib-test"
                recipient = "shop@example.com"

                [reminders]
                cron = "0 30 7 * * *"

                [auth]
                mode = "token"
                token = "s3cret"
                "#,
            ))
            .extract()
            .expect("valid config");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert_eq!(config.email.api_key.as_deref(), Some("xkeysib-test"));
        assert_eq!(config.email.sender_name, "Maintenance Reminder");
        assert_eq!(config.reminders.cron, "0 30 7 * * *");
        assert_eq!(config.auth.mode, AuthMode::Token);
    }

    #[test]
    fn missing_file_loads_defaults() {
        Jail::expect_with(|_jail| {
            let config = UpkeepConfig::load(Some("absent.toml")).expect("defaults");
            assert_eq!(config.gateway.port, DEFAULT_PORT);
            assert_eq!(config.auth.mode, AuthMode::None);
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_an_error_not_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "upkeep.toml",
                r#"
                [gateway]
                port = "abc"

                [auth]
                mode = "token"
                token = "s3cret"
                "#,
            )?;
            let err = UpkeepConfig::load(Some("upkeep.toml")).unwrap_err();
            assert!(matches!(err, crate::error::CoreError::Config(_)));

            jail.create_file("broken.toml", "[auth\nmode = ")?;
            assert!(UpkeepConfig::load(Some("broken.toml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nest_on_double_underscore() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "upkeep.toml",
                r#"
                [email]
                sender_name = "Shop"
                "#,
            )?;
            jail.set_env("UPKEEP_EMAIL__API_KEY", "xkeysib-env");
            jail.set_env("UPKEEP_GATEWAY__PORT", "8088");
            jail.set_env("UPKEEP_AUTH__MODE", "token");

            let config = UpkeepConfig::load(Some("upkeep.toml")).expect("valid config");
            assert_eq!(config.email.api_key.as_deref(), Some("xkeysib-env"));
            assert_eq!(config.email.sender_name, "Shop");
            assert_eq!(config.gateway.port, 8088);
            assert_eq!(config.auth.mode, AuthMode::Token);
            Ok(())
        });
    }
}
