//! Command classification for messages arriving outside a registration.

use crate::menu::{BTN_CONTACTS, BTN_PROFILE, BTN_REGISTER, BTN_STATUS, is_cancel};
use crate::store::OrderStatus;

/// What a message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/help`: greeting plus the main menu.
    Start,
    Register,
    Status,
    Profile,
    Contacts,
    Cancel,
    /// `/setstatus`; `None` when the arguments don't parse.
    SetStatus(Option<StatusArgs>),
    /// `/headers`: rewrite the sheet's header row.
    Headers,
    /// Anything else.
    Text(String),
}

/// Parsed arguments of `/setstatus <user_id> <status> [comment...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusArgs {
    pub user_id: String,
    pub status: OrderStatus,
    pub comment: String,
}

impl Command {
    /// Classify message content. Buttons match by exact label, slash
    /// commands case-insensitively and with an optional `@botname` suffix.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        if is_cancel(trimmed) {
            return Self::Cancel;
        }

        match trimmed {
            BTN_REGISTER => return Self::Register,
            BTN_STATUS => return Self::Status,
            BTN_PROFILE => return Self::Profile,
            BTN_CONTACTS => return Self::Contacts,
            _ => {}
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Text(content.to_string());
        };

        let (head, args) = rest
            .split_once(char::is_whitespace)
            .map(|(h, a)| (h, a.trim()))
            .unwrap_or((rest, ""));
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        match name.as_str() {
            "start" | "help" => Self::Start,
            "register" => Self::Register,
            "status" => Self::Status,
            "profile" => Self::Profile,
            "contacts" => Self::Contacts,
            "setstatus" => Self::SetStatus(parse_status_args(args)),
            "headers" => Self::Headers,
            _ => Self::Text(content.to_string()),
        }
    }

    /// Operator-only commands.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Self::SetStatus(_) | Self::Headers)
    }
}

/// `<user_id> <status> [comment...]`. The status is matched against the
/// known codes first, longest code first, so `Готов к выдаче` is not read as
/// `Готов` plus a comment. Otherwise the first word is taken verbatim.
fn parse_status_args(args: &str) -> Option<StatusArgs> {
    let mut words = args.split_whitespace();
    let user_id = words.next()?.to_string();
    let rest: Vec<&str> = words.collect();
    if rest.is_empty() {
        return None;
    }

    let mut known: Vec<OrderStatus> = OrderStatus::KNOWN.to_vec();
    known.sort_by_key(|s| std::cmp::Reverse(s.code().split_whitespace().count()));

    let matched = known.into_iter().find_map(|status| {
        let code_words: Vec<String> = status
            .code()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let head_matches = rest.len() >= code_words.len()
            && rest
                .iter()
                .zip(&code_words)
                .all(|(w, c)| w.to_lowercase() == *c);
        head_matches.then(|| (status, code_words.len()))
    });

    let (status, consumed) =
        matched.unwrap_or_else(|| (OrderStatus::from_code(rest[0]), 1));

    Some(StatusArgs {
        user_id,
        status,
        comment: rest[consumed..].join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_buttons() {
        assert_eq!(Command::parse("Регистрация клиента"), Command::Register);
        assert_eq!(Command::parse("Проверить статус"), Command::Status);
        assert_eq!(Command::parse(" Мой профиль "), Command::Profile);
        assert_eq!(Command::parse("Контакты"), Command::Contacts);
        assert_eq!(Command::parse("Отмена"), Command::Cancel);
    }

    #[test]
    fn parse_slash_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/HELP"), Command::Start);
        assert_eq!(Command::parse("/start@intake_bot"), Command::Start);
        assert_eq!(Command::parse("/register"), Command::Register);
        assert_eq!(Command::parse("/status"), Command::Status);
        assert_eq!(Command::parse("/profile"), Command::Profile);
        assert_eq!(Command::parse("/contacts"), Command::Contacts);
        assert_eq!(Command::parse("/cancel"), Command::Cancel);
        assert_eq!(Command::parse("/headers"), Command::Headers);
    }

    #[test]
    fn parse_falls_back_to_text() {
        assert_eq!(
            Command::parse("привет"),
            Command::Text("привет".to_string())
        );
        assert_eq!(
            Command::parse("/unknown thing"),
            Command::Text("/unknown thing".to_string())
        );
    }

    #[test]
    fn setstatus_single_word_code() {
        let Command::SetStatus(Some(args)) = Command::parse("/setstatus 42 Отправлен") else {
            panic!("expected parsed args");
        };
        assert_eq!(args.user_id, "42");
        assert_eq!(args.status, OrderStatus::Shipped);
        assert_eq!(args.comment, "");
    }

    #[test]
    fn setstatus_multi_word_code_with_comment() {
        let Command::SetStatus(Some(args)) =
            Command::parse("/setstatus 42 Готов к выдаче ул. Ленина 1")
        else {
            panic!("expected parsed args");
        };
        assert_eq!(args.status, OrderStatus::ReadyForPickup);
        assert_eq!(args.comment, "ул. Ленина 1");
    }

    #[test]
    fn setstatus_case_insensitive_code() {
        let Command::SetStatus(Some(args)) = Command::parse("/setstatus 7 в пути скоро") else {
            panic!("expected parsed args");
        };
        assert_eq!(args.status, OrderStatus::InTransit);
        assert_eq!(args.comment, "скоро");
    }

    #[test]
    fn setstatus_unknown_code_passes_through() {
        let Command::SetStatus(Some(args)) = Command::parse("/setstatus 42 Задержан таможня")
        else {
            panic!("expected parsed args");
        };
        assert_eq!(args.status, OrderStatus::Other("Задержан".into()));
        assert_eq!(args.comment, "таможня");
    }

    #[test]
    fn setstatus_missing_args() {
        assert_eq!(Command::parse("/setstatus"), Command::SetStatus(None));
        assert_eq!(Command::parse("/setstatus 42"), Command::SetStatus(None));
    }

    #[test]
    fn admin_only_commands() {
        assert!(Command::Headers.is_admin_only());
        assert!(Command::SetStatus(None).is_admin_only());
        assert!(!Command::Status.is_admin_only());
    }
}
