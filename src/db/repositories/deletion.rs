use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{deletion_logs, deletion_sync_events, prelude::*};
use crate::error::StoreError;

pub struct DeletionRepository {
    conn: DatabaseConnection,
}

impl DeletionRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i64) -> Result<Option<deletion_logs::Model>, StoreError> {
        Ok(DeletionLogs::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(
        &self,
        limit: u64,
    ) -> Result<Vec<deletion_logs::Model>, StoreError> {
        Ok(DeletionLogs::find()
            .order_by_desc(deletion_logs::Column::InitiatedAt)
            .limit(limit)
            .all(&self.conn)
            .await?)
    }

    pub async fn list_in_progress(&self) -> Result<Vec<deletion_logs::Model>, StoreError> {
        Ok(DeletionLogs::find()
            .filter(deletion_logs::Column::Status.eq("in-progress"))
            .all(&self.conn)
            .await?)
    }

    pub async fn create_in_txn(
        txn: &DatabaseTransaction,
        active: deletion_logs::ActiveModel,
    ) -> Result<deletion_logs::Model, StoreError> {
        Ok(active.insert(txn).await?)
    }

    pub async fn create(
        &self,
        active: deletion_logs::ActiveModel,
    ) -> Result<deletion_logs::Model, StoreError> {
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn save(
        &self,
        active: deletion_logs::ActiveModel,
    ) -> Result<deletion_logs::Model, StoreError> {
        Ok(active.update(&self.conn).await?)
    }

    pub async fn sync_events_for_log(
        &self,
        deletion_log_id: i64,
    ) -> Result<Vec<deletion_sync_events::Model>, StoreError> {
        Ok(DeletionSyncEvents::find()
            .filter(deletion_sync_events::Column::DeletionLogId.eq(deletion_log_id))
            .order_by_asc(deletion_sync_events::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    pub async fn create_sync_event(
        &self,
        deletion_log_id: i64,
        service_label: &str,
        status: &str,
        detail: &str,
    ) -> Result<deletion_sync_events::Model, StoreError> {
        let active = deletion_sync_events::ActiveModel {
            deletion_sync_event_id: Default::default(),
            deletion_log_id: Set(deletion_log_id),
            service_label: Set(service_label.to_string()),
            status: Set(status.to_string()),
            detail: Set(detail.to_string()),
            error: Set(None),
            raw_response: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update_sync_event_status(
        &self,
        id: i64,
        status: &str,
        detail: &str,
        error: Option<String>,
        raw_response: Option<String>,
    ) -> Result<(), StoreError> {
        let model = DeletionSyncEvents::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(StoreError::DeletionLogNotFound(id))?;
        let mut active: deletion_sync_events::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.detail = Set(detail.to_string());
        active.error = Set(error);
        active.raw_response = Set(raw_response);
        active.update(&self.conn).await?;
        Ok(())
    }
}
