//! Reply menus and button labels.
//!
//! Menus are static per conversation phase: the main menu outside a
//! registration, a single cancel button inside one.

pub const BTN_REGISTER: &str = "Регистрация клиента";
pub const BTN_STATUS: &str = "Проверить статус";
pub const BTN_PROFILE: &str = "Мой профиль";
pub const BTN_CONTACTS: &str = "Контакты";
pub const BTN_CANCEL: &str = "Отмена";

/// Which reply keyboard accompanies a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Menu {
    /// Leave whatever keyboard the user currently has.
    #[default]
    Keep,
    Main,
    Cancel,
}

impl Menu {
    /// Button rows, or `None` for [`Menu::Keep`].
    pub fn keyboard(&self) -> Option<Vec<Vec<String>>> {
        let rows: &[&[&str]] = match self {
            Self::Keep => return None,
            Self::Main => &[&[BTN_REGISTER, BTN_STATUS], &[BTN_PROFILE, BTN_CONTACTS]],
            Self::Cancel => &[&[BTN_CANCEL]],
        };
        Some(
            rows.iter()
                .map(|row| row.iter().map(|b| b.to_string()).collect())
                .collect(),
        )
    }
}

/// Text plus the menu to show with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub menu: Menu,
}

impl Reply {
    pub fn new(text: impl Into<String>, menu: Menu) -> Self {
        Self {
            text: text.into(),
            menu,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Menu::Keep)
    }
}

/// Whether `input` is the cancellation keyword or `/cancel`, with or without
/// an `@botname` suffix.
pub fn is_cancel(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.starts_with('/') {
        let command = trimmed.split('@').next().unwrap_or(trimmed);
        return command.eq_ignore_ascii_case("/cancel");
    }
    trimmed.to_lowercase() == BTN_CANCEL.to_lowercase()
}
