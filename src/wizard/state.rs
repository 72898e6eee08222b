//! Registration state machine: which field the wizard is waiting for.

use serde::{Deserialize, Serialize};

/// Steps of the registration wizard.
///
/// Progresses linearly: AwaitingFirstName → AwaitingLastName → AwaitingPhone
/// → AwaitingCity → AwaitingComments → Complete. `Complete` is never stored;
/// reaching it triggers the append and ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    AwaitingFirstName,
    AwaitingLastName,
    AwaitingPhone,
    AwaitingCity,
    AwaitingComments,
    Complete,
}

impl RegistrationStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: RegistrationStep) -> bool {
        self.next() == Some(target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<RegistrationStep> {
        use RegistrationStep::*;
        match self {
            AwaitingFirstName => Some(AwaitingLastName),
            AwaitingLastName => Some(AwaitingPhone),
            AwaitingPhone => Some(AwaitingCity),
            AwaitingCity => Some(AwaitingComments),
            AwaitingComments => Some(Complete),
            Complete => None,
        }
    }

    /// Question shown when the wizard enters this step.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::AwaitingFirstName => "📝 Введите ваше имя:",
            Self::AwaitingLastName => "📝 Введите вашу фамилию:",
            Self::AwaitingPhone => "📞 Введите ваш номер телефона:",
            Self::AwaitingCity => "🏙 Введите ваш город:",
            Self::AwaitingComments => {
                "💬 Добавьте комментарий к заказу (или напишите «без комментариев»):"
            }
            Self::Complete => "",
        }
    }

    /// 1-based position among the input steps, for "шаг 2 из 5".
    pub fn ordinal(&self) -> Option<usize> {
        Self::INPUT_STEPS.iter().position(|s| s == self).map(|i| i + 1)
    }

    /// The steps that collect a field, in order.
    pub const INPUT_STEPS: [RegistrationStep; 5] = [
        RegistrationStep::AwaitingFirstName,
        RegistrationStep::AwaitingLastName,
        RegistrationStep::AwaitingPhone,
        RegistrationStep::AwaitingCity,
        RegistrationStep::AwaitingComments,
    ];
}

impl Default for RegistrationStep {
    fn default() -> Self {
        Self::AwaitingFirstName
    }
}

impl std::fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingFirstName => "awaiting_first_name",
            Self::AwaitingLastName => "awaiting_last_name",
            Self::AwaitingPhone => "awaiting_phone",
            Self::AwaitingCity => "awaiting_city",
            Self::AwaitingComments => "awaiting_comments",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}
