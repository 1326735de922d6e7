use sea_orm::entity::prelude::*;

/// Append-only audit record for a single request transition. See spec §3
/// "TimelineEvent". Never mutated after insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "timeline_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub timeline_event_id: i64,
    pub request_id: i64,

    pub from_state: Option<String>,
    pub to_state: String,
    pub emitter_service: String,
    pub event_type_label: String,
    pub detail: String,
    pub is_new: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requests::Entity",
        from = "Column::RequestId",
        to = "super::requests::Column::RequestId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Requests,
}

impl Related<super::requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
