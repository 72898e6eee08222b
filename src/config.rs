//! Configuration types, read from the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default sheet tab holding the client rows.
pub const DEFAULT_SHEET_NAME: &str = "Клиенты";

/// Default text for the contacts command.
pub const DEFAULT_CONTACT_INFO: &str = "📞 Контакты:\n\n\
    Телефон: +996 700 000 000\n\
    Часы работы: Пн–Сб, 10:00–19:00\n\
    Пишите нам прямо в этот чат, мы ответим!";

/// Bot behaviour configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token. `None` disables the Telegram channel.
    pub bot_token: Option<SecretString>,
    /// Telegram usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// User ids allowed to run operator commands.
    pub admin_users: Vec<String>,
    /// Text shown by the contacts command.
    pub contact_info: String,
    /// Echo unrecognised text back when no registration is in progress.
    pub echo_unknown: bool,
    /// Idle time after which a per-user lane is reaped.
    pub lane_idle_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: vec!["*".to_string()],
            admin_users: Vec::new(),
            contact_info: DEFAULT_CONTACT_INFO.to_string(),
            echo_unknown: true,
            lane_idle_timeout: Duration::from_secs(300),
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bot_token = lookup("BOT_TOKEN")
            .or_else(|| lookup("TELEGRAM_BOT_TOKEN"))
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let allowed_users = lookup("TELEGRAM_ALLOWED_USERS")
            .map(|s| split_list(&s))
            .unwrap_or(defaults.allowed_users);

        let admin_users = lookup("INTAKE_ADMIN_USERS")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let contact_info = lookup("INTAKE_CONTACT_INFO")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.contact_info);

        let echo_unknown = match lookup("INTAKE_ECHO_UNKNOWN") {
            Some(raw) => parse_bool("INTAKE_ECHO_UNKNOWN", &raw)?,
            None => defaults.echo_unknown,
        };

        let lane_idle_timeout = match lookup("INTAKE_LANE_IDLE_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "INTAKE_LANE_IDLE_SECS".into(),
                    message: format!("expected seconds, got {raw:?}"),
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => defaults.lane_idle_timeout,
        };

        Ok(Self {
            bot_token,
            allowed_users,
            admin_users,
            contact_info,
            echo_unknown,
            lane_idle_timeout,
        })
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_users.iter().any(|u| u == user_id)
    }
}

/// Spreadsheet connection settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    /// Service account key JSON.
    pub service_account_json: Option<SecretString>,
    /// Use an in-process sheet instead of Google Sheets.
    pub local_sheet: bool,
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            spreadsheet_id: non_blank("GOOGLE_SPREADSHEET_ID"),
            sheet_name: non_blank("GOOGLE_SHEET_NAME")
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            service_account_json: non_blank("GOOGLE_SERVICE_ACCOUNT_JSON").map(SecretString::from),
            local_sheet: lookup("INTAKE_LOCAL_SHEET")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Whether both the spreadsheet id and the credentials are present.
    pub fn is_complete(&self) -> bool {
        self.spreadsheet_id.is_some() && self.service_account_json.is_some()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true/false, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn bot_config_defaults_when_env_empty() {
        let config = BotConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(config.bot_token.is_none());
        assert_eq!(config.allowed_users, vec!["*"]);
        assert!(config.admin_users.is_empty());
        assert!(config.echo_unknown);
        assert_eq!(config.lane_idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn bot_token_falls_back_to_telegram_var() {
        let config =
            BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "123:ABC")])).unwrap();
        assert_eq!(config.bot_token.unwrap().expose_secret(), "123:ABC");
    }

    #[test]
    fn admin_list_is_trimmed() {
        let config =
            BotConfig::from_lookup(lookup_from(&[("INTAKE_ADMIN_USERS", " 1, 2 ,,3")])).unwrap();
        assert_eq!(config.admin_users, vec!["1", "2", "3"]);
        assert!(config.is_admin("2"));
        assert!(!config.is_admin("4"));
    }

    #[test]
    fn invalid_echo_flag_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[("INTAKE_ECHO_UNKNOWN", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn invalid_lane_idle_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[("INTAKE_LANE_IDLE_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("INTAKE_LANE_IDLE_SECS"));
    }

    #[test]
    fn sheets_config_incomplete_without_credentials() {
        let config = SheetsConfig::from_lookup(lookup_from(&[("GOOGLE_SPREADSHEET_ID", "abc")]));
        assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
        assert!(!config.is_complete());
    }

    #[test]
    fn sheets_config_blank_values_count_as_missing() {
        let config = SheetsConfig::from_lookup(lookup_from(&[
            ("GOOGLE_SPREADSHEET_ID", "  "),
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
            ("GOOGLE_SHEET_NAME", ""),
        ]));
        assert!(config.spreadsheet_id.is_none());
        assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
        assert!(!config.is_complete());
    }

    #[test]
    fn sheets_config_local_flag() {
        let config = SheetsConfig::from_lookup(lookup_from(&[("INTAKE_LOCAL_SHEET", "1")]));
        assert!(config.local_sheet);
    }
}
