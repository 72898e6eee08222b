//! Error types for the intake bot.
//!
//! Store and registration errors render as the Russian text shown to the
//! customer, since every failure is relayed verbatim in the reply.

/// Errors that stop the bot's run loop. Store, registration and config
/// failures are handled where they occur and never reach it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Record store errors, caught at the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Spreadsheet id or credentials are missing. Permanent until reconfigured.
    #[error("Google Sheets не настроен")]
    NotConfigured,

    /// Network or auth failure talking to the spreadsheet service.
    #[error("Ошибка связи с таблицей: {0}")]
    Transport(String),

    #[error("Клиент с ID {user_id} не найден в таблице")]
    NotFound { user_id: String },

    #[error("Некорректный ответ таблицы: {0}")]
    InvalidResponse(String),

    #[error("Ошибка авторизации сервисного аккаунта: {0}")]
    Credentials(String),
}

impl StoreError {
    /// Whether retrying later could succeed without reconfiguration.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors raised by the registration wizard's entry guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Вы уже зарегистрированы! Используйте «Проверить статус», чтобы узнать о заказе.")]
    DuplicateRegistration { user_id: String },

    #[error("Регистрация уже идёт. Продолжите ввод или нажмите «Отмена».")]
    InProgress { user_id: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(StoreError::Transport("timeout".into()).is_transient());
        assert!(!StoreError::NotConfigured.is_transient());
        assert!(
            !StoreError::NotFound {
                user_id: "42".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn channel_error_converts_into_top_level() {
        let err: Error = ChannelError::Http("timeout".into()).into();
        assert!(matches!(err, Error::Channel(ChannelError::Http(_))));
        assert_eq!(err.to_string(), "Channel error: HTTP error: timeout");
    }

    #[test]
    fn not_found_mentions_user_id() {
        let err = StoreError::NotFound {
            user_id: "777".into(),
        };
        assert!(err.to_string().contains("777"));
    }
}
