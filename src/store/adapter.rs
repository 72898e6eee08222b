//! Record store adapter: client rows over a fixed-width sheet range.
//!
//! Every lookup is a full-range linear scan: the sheet has no index, and the
//! catalogue is small enough (a hand-maintained CRM) that this is fine.

use std::sync::Arc;

use async_trait::async_trait;

use super::range::{first_row_of, full_range, header_range, row_span};
use super::record::{
    COLUMN_COUNT, ClientRecord, HEADERS, OrderStatus, RowPosition, StatusView, cell, col,
};
use super::sheet::SheetClient;
use crate::error::StoreError;

/// Timestamp format written to the last-updated column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Operations the bot performs against the client table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether a row with this external user id exists. `false` when the
    /// store is unreachable or unconfigured.
    async fn exists(&self, user_id: &str) -> bool;

    /// Append a new client row with the initial status. Does not check
    /// uniqueness; callers check `exists` first.
    async fn append(&self, record: &ClientRecord) -> Result<RowPosition, StoreError>;

    /// Status projection of the first matching row. `None` when absent or on
    /// any store error.
    async fn get_status(&self, user_id: &str) -> Option<StatusView>;

    /// Write status, timestamp and comment to the matching row.
    async fn update_status(
        &self,
        user_id: &str,
        status: &OrderStatus,
        comment: &str,
    ) -> Result<(), StoreError>;

    /// Overwrite row 1 with the column headers.
    async fn setup_headers(&self) -> Result<(), StoreError>;
}

struct Backend {
    client: Arc<dyn SheetClient>,
    sheet: String,
}

/// [`RecordStore`] over a [`SheetClient`]. A store built with
/// [`SheetStore::disabled`] fails every call with `NotConfigured` without
/// touching the network.
pub struct SheetStore {
    backend: Option<Backend>,
}

impl SheetStore {
    pub fn new(client: Arc<dyn SheetClient>, sheet_name: impl Into<String>) -> Self {
        Self {
            backend: Some(Backend {
                client,
                sheet: sheet_name.into(),
            }),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<&Backend, StoreError> {
        self.backend.as_ref().ok_or(StoreError::NotConfigured)
    }

    /// Position and cells of the first row whose id column equals `user_id`.
    async fn find_row(&self, user_id: &str) -> Result<Option<(RowPosition, Vec<String>)>, StoreError> {
        let backend = self.backend()?;
        let rows = backend.client.get_values(&full_range(&backend.sheet)).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .find(|(_, row)| cell(row, col::EXTERNAL_USER_ID) == user_id)
            .map(|(index, row)| (RowPosition::from_index(index), row)))
    }
}

#[async_trait]
impl RecordStore for SheetStore {
    async fn exists(&self, user_id: &str) -> bool {
        match self.find_row(user_id).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "exists check failed; treating as absent");
                false
            }
        }
    }

    async fn append(&self, record: &ClientRecord) -> Result<RowPosition, StoreError> {
        let backend = self.backend()?;
        let outcome = backend
            .client
            .append_values(&full_range(&backend.sheet), vec![record.to_new_row()])
            .await?;

        let row = first_row_of(&outcome.updated_range).ok_or_else(|| {
            StoreError::InvalidResponse(format!("unexpected range {}", outcome.updated_range))
        })?;

        tracing::info!(
            user_id = %record.external_user_id,
            row = row.number(),
            "Client row appended"
        );
        Ok(row)
    }

    async fn get_status(&self, user_id: &str) -> Option<StatusView> {
        match self.find_row(user_id).await {
            Ok(found) => found.map(|(_, row)| StatusView::from_row(&row)),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "status lookup failed");
                None
            }
        }
    }

    async fn update_status(
        &self,
        user_id: &str,
        status: &OrderStatus,
        comment: &str,
    ) -> Result<(), StoreError> {
        let backend = self.backend()?;
        let (row, _) = self
            .find_row(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                user_id: user_id.to_string(),
            })?;

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let range = row_span(&backend.sheet, row, col::STATUS, col::STATUS_COMMENT);
        backend
            .client
            .update_values(
                &range,
                vec![vec![status.code().to_string(), timestamp, comment.to_string()]],
            )
            .await?;

        tracing::info!(user_id, row = row.number(), status = %status, "Status updated");
        Ok(())
    }

    async fn setup_headers(&self) -> Result<(), StoreError> {
        let backend = self.backend()?;
        let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        debug_assert_eq!(headers.len(), COLUMN_COUNT);
        backend
            .client
            .update_values(&header_range(&backend.sheet), vec![headers])
            .await?;
        tracing::info!(sheet = %backend.sheet, "Sheet headers written");
        Ok(())
    }
}
