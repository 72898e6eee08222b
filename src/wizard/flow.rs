//! RegistrationFlow: drives the wizard and performs the final append.

use std::sync::Arc;

use super::session::{Advance, Session, SessionRegistry};
use super::state::RegistrationStep;
use crate::error::RegistrationError;
use crate::menu::{Menu, Reply, is_cancel};
use crate::store::{RecordStore, RowPosition};

/// Coordinates the session registry and the record store for registration.
pub struct RegistrationFlow {
    store: Arc<dyn RecordStore>,
    sessions: Arc<SessionRegistry>,
}

impl RegistrationFlow {
    pub fn new(store: Arc<dyn RecordStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Whether the user has an unfinished wizard.
    pub fn is_active(&self, user_id: &str) -> bool {
        self.sessions.contains(user_id)
    }

    /// Begin registration, refusing already-registered users.
    pub async fn start(&self, user_id: &str) -> Reply {
        match self.try_start(user_id).await {
            Ok(step) => Reply::new(
                format!(
                    "📋 Регистрация клиента\n\nОтвечайте на вопросы по очереди. \
                     Чтобы прервать, нажмите «Отмена».\n\n{}",
                    step_prompt(step)
                ),
                Menu::Cancel,
            ),
            Err(e @ RegistrationError::InProgress { .. }) => {
                let current = self
                    .sessions
                    .step(user_id)
                    .unwrap_or_default();
                Reply::new(format!("{e}\n\n{}", step_prompt(current)), Menu::Cancel)
            }
            Err(e @ RegistrationError::DuplicateRegistration { .. }) => {
                tracing::info!(user_id, "Registration refused: already registered");
                Reply::new(format!("ℹ️ {e}"), Menu::Main)
            }
        }
    }

    /// Entry guard plus session creation.
    async fn try_start(&self, user_id: &str) -> Result<RegistrationStep, RegistrationError> {
        if self.sessions.contains(user_id) {
            return Err(RegistrationError::InProgress {
                user_id: user_id.to_string(),
            });
        }
        if self.store.exists(user_id).await {
            return Err(RegistrationError::DuplicateRegistration {
                user_id: user_id.to_string(),
            });
        }
        self.sessions
            .create_if_absent(user_id)
            .ok_or_else(|| RegistrationError::InProgress {
                user_id: user_id.to_string(),
            })
    }

    /// Feed a message to the user's wizard. `None` if no wizard is active.
    pub async fn handle_input(&self, user_id: &str, input: &str) -> Option<Reply> {
        if is_cancel(input) {
            let session = self.sessions.remove(user_id)?;
            let age_secs = (chrono::Utc::now() - session.started_at).num_seconds();
            tracing::info!(user_id, step = %session.step, age_secs, "Registration cancelled");
            return Some(Reply::new(
                "❌ Регистрация отменена. Вы можете начать заново в любой момент.",
                Menu::Main,
            ));
        }

        match self.sessions.advance(user_id, input)? {
            Advance::Next(step) => Some(Reply::new(step_prompt(step), Menu::Cancel)),
            Advance::Complete(session) => Some(self.complete(session).await),
        }
    }

    /// Exactly one append per completed session. The session is already out
    /// of the registry, whatever the store answers.
    async fn complete(&self, session: Session) -> Reply {
        let record = &session.draft;
        match self.store.append(record).await {
            Ok(row) => {
                tracing::info!(user_id = %session.user_id, row = row.number(), "Registration complete");
                Reply::new(success_text(record, row), Menu::Main)
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Registration append failed");
                let hint = if e.is_transient() {
                    "Попробуйте зарегистрироваться ещё раз позже."
                } else {
                    "Пожалуйста, сообщите об этом администратору."
                };
                Reply::new(
                    format!("⚠️ Не удалось сохранить регистрацию: {e}\n\n{hint}"),
                    Menu::Main,
                )
            }
        }
    }
}

fn step_prompt(step: RegistrationStep) -> String {
    match step.ordinal() {
        Some(n) => format!(
            "Шаг {n} из {}\n{}",
            RegistrationStep::INPUT_STEPS.len(),
            step.prompt()
        ),
        None => step.prompt().to_string(),
    }
}

fn success_text(record: &crate::store::ClientRecord, row: RowPosition) -> String {
    format!(
        "✅ Регистрация завершена!\n\n\
         👤 {} {}\n\
         📞 {}\n\
         🏙 {}\n\
         💬 {}\n\n\
         Клиент добавлен в строку {row}.\n\n\
         Добро пожаловать! Статус заказа можно узнать кнопкой «Проверить статус».",
        record.first_name, record.last_name, record.phone, record.city, record.comments
    )
}
