//! Session registry: in-memory wizard progress keyed by user id.
//!
//! At most one session per user. All mutation goes through DashMap's entry
//! API, so create-if-absent and advance are atomic per key. Nothing is
//! persisted: a restart drops in-flight wizards, and no partial row was ever
//! written for them.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::state::RegistrationStep;
use crate::store::ClientRecord;

/// One user's in-progress registration.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub step: RegistrationStep,
    /// Fields collected so far; `external_user_id` is set at creation.
    pub draft: ClientRecord,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            step: RegistrationStep::default(),
            draft: ClientRecord {
                external_user_id: user_id.to_string(),
                ..ClientRecord::default()
            },
            started_at: Utc::now(),
        }
    }

    /// Store `input` in the field for the current step and move to the next
    /// step. Input is free text; only surrounding whitespace is trimmed.
    pub fn apply_input(&mut self, input: &str) -> RegistrationStep {
        let value = input.trim().to_string();
        let field = match self.step {
            RegistrationStep::AwaitingFirstName => &mut self.draft.first_name,
            RegistrationStep::AwaitingLastName => &mut self.draft.last_name,
            RegistrationStep::AwaitingPhone => &mut self.draft.phone,
            RegistrationStep::AwaitingCity => &mut self.draft.city,
            RegistrationStep::AwaitingComments => &mut self.draft.comments,
            RegistrationStep::Complete => return self.step,
        };
        *field = value;

        if let Some(next) = self.step.next() {
            debug_assert!(self.step.can_transition_to(next));
            self.step = next;
        }
        self.step
    }
}

/// Outcome of feeding one message to a user's session.
#[derive(Debug, Clone)]
pub enum Advance {
    /// Moved to another input step.
    Next(RegistrationStep),
    /// All fields collected; the session has been removed from the registry.
    Complete(Session),
}

/// Live sessions, at most one per user id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `user_id` unless one exists. Returns the step of
    /// the new session, or `None` if one was already live.
    pub fn create_if_absent(&self, user_id: &str) -> Option<RegistrationStep> {
        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let session = Session::new(user_id);
                let step = session.step;
                slot.insert(session);
                tracing::info!(user_id, "Registration session started");
                Some(step)
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.get(user_id).map(|entry| entry.clone())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    /// Current step of a live session.
    pub fn step(&self, user_id: &str) -> Option<RegistrationStep> {
        self.sessions.get(user_id).map(|entry| entry.step)
    }

    /// Apply `input` to the user's session. On completion the session is
    /// taken out of the registry in the same critical section.
    pub fn advance(&self, user_id: &str, input: &str) -> Option<Advance> {
        match self.sessions.entry(user_id.to_string()) {
            Entry::Vacant(_) => None,
            Entry::Occupied(mut slot) => {
                let step = slot.get_mut().apply_input(input);
                if step.is_terminal() {
                    Some(Advance::Complete(slot.remove()))
                } else {
                    Some(Advance::Next(step))
                }
            }
        }
    }

    pub fn remove(&self, user_id: &str) -> Option<Session> {
        self.sessions.remove(user_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
