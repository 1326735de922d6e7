use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{episodes, prelude::*};
use crate::error::StoreError;

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i64) -> Result<Option<episodes::Model>, StoreError> {
        Ok(Episodes::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn for_request(
        &self,
        request_id: i64,
    ) -> Result<Vec<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::RequestId.eq(request_id))
            .order_by_asc(episodes::Column::SeasonNumber)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?)
    }

    pub async fn for_request_in_txn(
        txn: &DatabaseTransaction,
        request_id: i64,
    ) -> Result<Vec<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::RequestId.eq(request_id))
            .order_by_asc(episodes::Column::SeasonNumber)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(txn)
            .await?)
    }

    pub async fn find_by_season_episode_in_txn(
        txn: &DatabaseTransaction,
        request_id: i64,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::RequestId.eq(request_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(txn)
            .await?)
    }

    /// Episode correlation by content hash. Used when a season-pack hash is
    /// shared across every episode in the grab.
    pub async fn by_content_hash_in_txn(
        txn: &DatabaseTransaction,
        hash: &str,
    ) -> Result<Vec<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::ContentHash.eq(hash.to_lowercase()))
            .all(txn)
            .await?)
    }

    pub async fn by_content_hash(
        &self,
        hash: &str,
    ) -> Result<Vec<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::ContentHash.eq(hash.to_lowercase()))
            .all(&self.conn)
            .await?)
    }

    pub async fn by_final_path_in_txn(
        txn: &DatabaseTransaction,
        path: &str,
    ) -> Result<Option<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::FinalPath.eq(path))
            .one(txn)
            .await?)
    }

    pub async fn by_final_path(
        &self,
        path: &str,
    ) -> Result<Option<episodes::Model>, StoreError> {
        Ok(Episodes::find()
            .filter(episodes::Column::FinalPath.eq(path))
            .one(&self.conn)
            .await?)
    }

    pub async fn create_in_txn(
        txn: &DatabaseTransaction,
        active: episodes::ActiveModel,
    ) -> Result<episodes::Model, StoreError> {
        Ok(active.insert(txn).await?)
    }

    pub async fn save_in_txn(
        txn: &DatabaseTransaction,
        active: episodes::ActiveModel,
    ) -> Result<episodes::Model, StoreError> {
        Ok(active.update(txn).await?)
    }

    pub fn touch_updated_at(active: &mut episodes::ActiveModel, now: &str) {
        active.updated_at = Set(now.to_string());
    }
}
