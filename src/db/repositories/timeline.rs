use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::domain::model::RequestState;
use crate::entities::{prelude::*, timeline_events};
use crate::error::StoreError;

pub struct TimelineRepository {
    conn: DatabaseConnection,
}

impl TimelineRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn for_request(
        &self,
        request_id: i64,
    ) -> Result<Vec<timeline_events::Model>, StoreError> {
        Ok(TimelineEvents::find()
            .filter(timeline_events::Column::RequestId.eq(request_id))
            .order_by_asc(timeline_events::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    /// Append a single transition record. Always called from within the
    /// same transaction as the state mutation it documents, per spec §4.C.
    #[allow(clippy::too_many_arguments)]
    pub async fn append_in_txn(
        txn: &DatabaseTransaction,
        request_id: i64,
        from_state: Option<RequestState>,
        to_state: RequestState,
        emitter_service: &str,
        event_type_label: &str,
        detail: &str,
        is_new: bool,
    ) -> Result<timeline_events::Model, StoreError> {
        let active = timeline_events::ActiveModel {
            timeline_event_id: Default::default(),
            request_id: Set(request_id),
            from_state: Set(from_state.map(|s| s.as_str().to_string())),
            to_state: Set(to_state.as_str().to_string()),
            emitter_service: Set(emitter_service.to_string()),
            event_type_label: Set(event_type_label.to_string()),
            detail: Set(detail.to_string()),
            is_new: Set(is_new),
            created_at: Set(Utc::now().to_rfc3339()),
        };
        Ok(active.insert(txn).await?)
    }
}
