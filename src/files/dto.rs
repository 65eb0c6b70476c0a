use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::UserRef;

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub filename: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub user: UserRef,
}
