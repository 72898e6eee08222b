//! Status and profile lookups. Read-only; never touches wizard sessions.

use std::sync::Arc;

use crate::channels::UserIdentity;
use crate::menu::{BTN_REGISTER, Menu, Reply};
use crate::store::{RecordStore, StatusView};

/// What the store knows about a user's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    NotRegistered,
    /// Registered, but the status row could not be read this time.
    Unavailable,
    Registered(StatusView),
}

pub struct QueryService {
    store: Arc<dyn RecordStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn status_report(&self, user_id: &str) -> StatusReport {
        if !self.store.exists(user_id).await {
            return StatusReport::NotRegistered;
        }
        match self.store.get_status(user_id).await {
            Some(view) => StatusReport::Registered(view),
            None => StatusReport::Unavailable,
        }
    }

    /// Reply for the check-status command.
    pub async fn status_view(&self, user_id: &str) -> Reply {
        let text = match self.status_report(user_id).await {
            StatusReport::NotRegistered => not_registered_text(),
            StatusReport::Unavailable => {
                "⚠️ Не удалось получить статус заказа. Попробуйте позже.".to_string()
            }
            StatusReport::Registered(view) => format_status(&view),
        };
        Reply::new(text, Menu::Main)
    }

    /// Reply for the profile command: platform identity plus registration status.
    pub async fn profile_view(&self, identity: &UserIdentity) -> Reply {
        let registration = match self.status_report(&identity.id).await {
            StatusReport::NotRegistered => "❌ Не зарегистрирован".to_string(),
            StatusReport::Unavailable => "✅ Зарегистрирован (статус недоступен)".to_string(),
            StatusReport::Registered(view) => {
                format!("✅ Зарегистрирован\n📦 {}", view.status.description())
            }
        };

        let text = format!(
            "👤 Информация о профиле:\n\n\
             🆔 ID: {}\n\
             👤 Имя: {}\n\
             👥 Фамилия: {}\n\
             📝 Username: {}\n\
             🌐 Язык: {}\n\n\
             {registration}",
            identity.id,
            identity.first_name.as_deref().unwrap_or("Не указано"),
            identity.last_name.as_deref().unwrap_or("Не указана"),
            identity
                .username
                .as_deref()
                .map(|u| format!("@{u}"))
                .unwrap_or_else(|| "Не указан".to_string()),
            identity.language_code.as_deref().unwrap_or("Не указан"),
        );
        Reply::new(text, Menu::Main)
    }
}

fn not_registered_text() -> String {
    format!("❌ Вы ещё не зарегистрированы.\n\nНажмите «{BTN_REGISTER}», чтобы пройти регистрацию.")
}

/// Status block: description, then timestamp and comment when present.
pub fn format_status(view: &StatusView) -> String {
    let mut text = format!("📦 Статус вашего заказа:\n\n{}", view.status.description());
    if let Some(updated) = &view.last_updated {
        text.push_str(&format!("\n🕒 Обновлено: {updated}"));
    }
    if let Some(comment) = &view.status_comment {
        text.push_str(&format!("\n💬 Комментарий: {comment}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ClientRecord, MemorySheet, OrderStatus, SheetStore};

    async fn service_with_client(user_id: &str) -> (QueryService, Arc<SheetStore>, Arc<MemorySheet>) {
        let sheet = Arc::new(MemorySheet::new());
        let store = Arc::new(SheetStore::new(sheet.clone(), "Клиенты"));
        store
            .append(&ClientRecord {
                first_name: "Иван".into(),
                external_user_id: user_id.into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (QueryService::new(store.clone()), store, sheet)
    }

    #[test]
    fn format_status_includes_optional_lines() {
        let view = StatusView {
            status: OrderStatus::InTransit,
            last_updated: Some("2024-05-01 10:00:00".into()),
            status_comment: Some("Ожидается в пятницу".into()),
        };
        let text = format_status(&view);
        assert!(text.contains("в пути"));
        assert!(text.contains("Обновлено: 2024-05-01 10:00:00"));
        assert!(text.contains("Комментарий: Ожидается в пятницу"));
    }

    #[test]
    fn format_status_unknown_code_shows_raw() {
        let view = StatusView {
            status: OrderStatus::Other("На складе".into()),
            last_updated: None,
            status_comment: None,
        };
        let text = format_status(&view);
        assert!(text.contains("Статус: На складе"));
        assert!(!text.contains("Обновлено"));
    }

    #[tokio::test]
    async fn unregistered_user_is_not_registered() {
        let (service, _, _) = service_with_client("1").await;
        assert_eq!(service.status_report("2").await, StatusReport::NotRegistered);
        assert!(service.status_view("2").await.text.contains("не зарегистрированы"));
    }

    #[tokio::test]
    async fn unreachable_store_reads_not_registered() {
        let (service, _, sheet) = service_with_client("1").await;
        sheet.set_offline(true);
        assert_eq!(service.status_report("1").await, StatusReport::NotRegistered);
    }

    #[tokio::test]
    async fn status_after_update_shows_description_and_timestamp() {
        let (service, store, _) = service_with_client("42").await;
        store
            .update_status("42", &OrderStatus::Shipped, "")
            .await
            .unwrap();

        let StatusReport::Registered(view) = service.status_report("42").await else {
            panic!("expected a registered report");
        };
        assert_eq!(view.status, OrderStatus::Shipped);
        assert!(view.last_updated.is_some());

        let reply = service.status_view("42").await;
        assert!(reply.text.contains(&OrderStatus::Shipped.description()));
    }

    #[tokio::test]
    async fn profile_view_fills_missing_fields() {
        let (service, _, _) = service_with_client("42").await;
        let identity = UserIdentity {
            id: "42".into(),
            first_name: Some("Иван".into()),
            last_name: None,
            username: Some("ivan".into()),
            language_code: None,
        };
        let text = service.profile_view(&identity).await.text;
        assert!(text.contains("ID: 42"));
        assert!(text.contains("Имя: Иван"));
        assert!(text.contains("Фамилия: Не указана"));
        assert!(text.contains("@ivan"));
        assert!(text.contains("✅ Зарегистрирован"));
        assert!(text.contains("в обработке"));
    }
}
