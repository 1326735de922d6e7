use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{prelude::*, requests};
use crate::error::StoreError;

/// Requests are excluded from the active set once they reach a terminal
/// state. AVAILABLE/FAILED rows still exist (DELETED is represented by the
/// row's absence, see domain::model::RequestState), so every correlator
/// query filters them out explicitly.
const TERMINAL_STATES: [&str; 2] = ["AVAILABLE", "FAILED"];

pub struct RequestRepository {
    conn: DatabaseConnection,
}

fn active_filter() -> Condition {
    Condition::all().add(requests::Column::State.is_not_in(TERMINAL_STATES))
}

impl RequestRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i64) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find_by_id(id).one(&self.conn).await?)
    }

    /// Same as [`Self::get`] but scoped to the active set — correlator
    /// lookups that land on an id must never resurrect a terminal request.
    pub async fn get_active(&self, id: i64) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find_by_id(id)
            .filter(active_filter())
            .one(&self.conn)
            .await?)
    }

    pub async fn get_in_txn(
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find_by_id(id).one(txn).await?)
    }

    pub async fn list_active(&self) -> Result<Vec<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .order_by_desc(requests::Column::UpdatedAt)
            .all(&self.conn)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<requests::Model>, StoreError> {
        Ok(Requests::find()
            .order_by_desc(requests::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    pub async fn by_content_hash(
        &self,
        hash: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::ContentHash.eq(hash.to_lowercase()))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    pub async fn by_request_manager_id(
        &self,
        id: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::RequestManagerId.eq(id))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    pub async fn by_content_db_id(
        &self,
        id: &str,
        media_kind: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::ContentDbId.eq(id))
            .filter(requests::Column::MediaKind.eq(media_kind))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    pub async fn by_tvdb_id(
        &self,
        id: &str,
        media_kind: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::TvdbId.eq(id))
            .filter(requests::Column::MediaKind.eq(media_kind))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    pub async fn by_final_path_exact(
        &self,
        path: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::FinalPath.eq(path))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    pub async fn by_media_server_id(
        &self,
        id: &str,
    ) -> Result<Option<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::MediaServerId.eq(id))
            .order_by_desc(requests::Column::CreatedAt)
            .one(&self.conn)
            .await?)
    }

    /// Fuzzy title + exact year, last-resort correlation path. Fetches the
    /// active candidates for the year and leaves fuzzy matching (normalized
    /// edit distance or containment) to the caller, since sea-orm has no
    /// portable fuzzy-match operator across backends.
    pub async fn candidates_by_year(
        &self,
        year: i32,
    ) -> Result<Vec<requests::Model>, StoreError> {
        Ok(Requests::find()
            .filter(active_filter())
            .filter(requests::Column::Year.eq(year))
            .order_by_desc(requests::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    pub async fn create(
        &self,
        active: requests::ActiveModel,
    ) -> Result<requests::Model, StoreError> {
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn create_in_txn(
        txn: &DatabaseTransaction,
        active: requests::ActiveModel,
    ) -> Result<requests::Model, StoreError> {
        Ok(active.insert(txn).await?)
    }

    pub async fn save_in_txn(
        txn: &DatabaseTransaction,
        active: requests::ActiveModel,
    ) -> Result<requests::Model, StoreError> {
        Ok(active.update(txn).await?)
    }

    pub async fn delete_in_txn(
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<(), StoreError> {
        Requests::delete_by_id(id).exec(txn).await?;
        Ok(())
    }

    pub fn touch_updated_at(active: &mut requests::ActiveModel) {
        active.updated_at = Set(Utc::now().to_rfc3339());
    }
}
