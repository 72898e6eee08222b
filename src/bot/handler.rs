//! MessageHandler: turns one inbound message into at most one reply.

use std::sync::Arc;

use super::commands::{Command, StatusArgs};
use crate::channels::{IncomingMessage, OutgoingResponse, UserIdentity};
use crate::config::BotConfig;
use crate::menu::{Menu, Reply};
use crate::query::QueryService;
use crate::store::RecordStore;
use crate::wizard::{RegistrationFlow, SessionRegistry};

/// Routes messages to the registration wizard, the query service or the
/// operator commands.
pub struct MessageHandler {
    flow: RegistrationFlow,
    query: QueryService,
    store: Arc<dyn RecordStore>,
    config: BotConfig,
}

impl MessageHandler {
    pub fn new(store: Arc<dyn RecordStore>, config: BotConfig) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        Self {
            flow: RegistrationFlow::new(Arc::clone(&store), sessions),
            query: QueryService::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    pub fn flow(&self) -> &RegistrationFlow {
        &self.flow
    }

    /// Handle one message. `None` means nothing is sent back.
    ///
    /// While a registration is active every message belongs to the wizard;
    /// commands are only recognised outside one.
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<OutgoingResponse> {
        let user_id = msg.user_id();

        if self.flow.is_active(user_id) {
            return self
                .flow
                .handle_input(user_id, &msg.content)
                .await
                .map(OutgoingResponse::from);
        }

        let command = Command::parse(&msg.content);
        tracing::debug!(user_id, channel = %msg.channel, ?command, "Dispatching command");

        if command.is_admin_only() && !self.config.is_admin(user_id) {
            tracing::warn!(user_id, "Operator command refused");
            return Some(Reply::text("⛔ Эта команда доступна только операторам.").into());
        }

        let reply = match command {
            Command::Start => greeting(&msg.sender),
            Command::Register => self.flow.start(user_id).await,
            Command::Status => self.query.status_view(user_id).await,
            Command::Profile => self.query.profile_view(&msg.sender).await,
            Command::Contacts => Reply::new(self.config.contact_info.clone(), Menu::Main),
            // The flow answers cancel only when a session exists.
            Command::Cancel => match self.flow.handle_input(user_id, &msg.content).await {
                Some(reply) => reply,
                None => Reply::new("Нечего отменять: регистрация не начата.", Menu::Main),
            },
            Command::SetStatus(Some(args)) => self.set_status(args).await,
            Command::SetStatus(None) => Reply::text(
                "Использование: /setstatus <user_id> <статус> [комментарий]\n\
                 Статусы: В обработке, Отправлен, В пути, Прибыл, Готов к выдаче, Выдан",
            ),
            Command::Headers => self.setup_headers().await,
            Command::Text(text) => {
                if !self.config.echo_unknown {
                    return None;
                }
                Reply::text(format!("Эхо: {text}"))
            }
        };

        Some(reply.into())
    }

    async fn set_status(&self, args: StatusArgs) -> Reply {
        let StatusArgs {
            user_id,
            status,
            comment,
        } = args;
        match self.store.update_status(&user_id, &status, &comment).await {
            Ok(()) => Reply::text(format!(
                "✅ Статус клиента {user_id} обновлён: {status}"
            )),
            Err(e) => Reply::text(format!("⚠️ Не удалось обновить статус: {e}")),
        }
    }

    async fn setup_headers(&self) -> Reply {
        match self.store.setup_headers().await {
            Ok(()) => Reply::text("✅ Заголовки таблицы обновлены."),
            Err(e) => Reply::text(format!("⚠️ Не удалось обновить заголовки: {e}")),
        }
    }
}

fn greeting(sender: &UserIdentity) -> Reply {
    Reply::new(
        format!(
            "👋 Здравствуйте, {}!\n\n\
             Я помогу зарегистрироваться клиентом и узнать статус заказа.\n\
             Выберите действие в меню ниже.",
            sender.display_name()
        ),
        Menu::Main,
    )
}
