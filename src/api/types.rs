use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestDto {
    pub request_id: i64,
    pub title: String,
    pub media_kind: String,
    pub is_anime: bool,
    pub state: String,
    pub download_percentage: f32,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub quality_label: Option<String>,
    pub requesting_user: String,
    pub final_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub available_at: Option<String>,
}

impl From<crate::entities::requests::Model> for RequestDto {
    fn from(m: crate::entities::requests::Model) -> Self {
        Self {
            request_id: m.request_id,
            title: m.title,
            media_kind: m.media_kind,
            is_anime: crate::domain::model::IsAnime::parse(&m.is_anime).is_true(),
            state: m.state,
            download_percentage: m.download_percentage,
            year: m.year,
            poster_url: m.poster_url,
            quality_label: m.quality_label,
            requesting_user: m.requesting_user,
            final_path: m.final_path,
            created_at: m.created_at,
            updated_at: m.updated_at,
            available_at: m.available_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestDetailDto {
    #[serde(flatten)]
    pub request: RequestDto,
    pub episodes: Vec<EpisodeDto>,
    pub timeline: Vec<TimelineEventDto>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeDto {
    pub episode_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub state: String,
    pub final_path: Option<String>,
}

impl From<crate::entities::episodes::Model> for EpisodeDto {
    fn from(m: crate::entities::episodes::Model) -> Self {
        Self {
            episode_id: m.episode_id,
            season_number: m.season_number,
            episode_number: m.episode_number,
            state: m.state,
            final_path: m.final_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineEventDto {
    pub timeline_event_id: i64,
    pub from_state: Option<String>,
    pub to_state: String,
    pub emitter_service: String,
    pub event_type: String,
    pub detail: String,
    pub occurred_at: String,
}

impl From<crate::entities::timeline_events::Model> for TimelineEventDto {
    fn from(m: crate::entities::timeline_events::Model) -> Self {
        Self {
            timeline_event_id: m.timeline_event_id,
            from_state: m.from_state,
            to_state: m.to_state,
            emitter_service: m.emitter_service,
            event_type: m.event_type_label,
            detail: m.detail,
            occurred_at: m.occurred_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletionLogDto {
    pub deletion_log_id: i64,
    pub request_id: i64,
    pub title: String,
    pub source: String,
    pub status: String,
    pub delete_files: bool,
    pub initiated_at: String,
    pub completed_at: Option<String>,
}

impl From<crate::entities::deletion_logs::Model> for DeletionLogDto {
    fn from(m: crate::entities::deletion_logs::Model) -> Self {
        Self {
            deletion_log_id: m.deletion_log_id,
            request_id: m.request_id,
            title: m.title,
            source: m.source,
            status: m.status,
            delete_files: m.delete_files,
            initiated_at: m.initiated_at,
            completed_at: m.completed_at,
        }
    }
}
