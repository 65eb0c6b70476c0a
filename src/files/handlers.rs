use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::UserRef, AuthUser},
    error::ApiError,
    events::repo::Event,
    notifications::{fanout, NotificationCategory},
    realtime::{Dispatcher, WsOutboundEvent},
    state::AppState,
};

use super::dto::FileResponse;
use super::repo::{self, FileWithUser};
use super::services;

pub fn router() -> Router<AppState> {
    // The :id segment is an event for GET/POST and a file for DELETE,
    // matching the legacy client's routes.
    Router::new()
        .route(
            "/files/:id",
            get(list_files).post(upload_file).delete(delete_file),
        )
        .route("/files/zip/:id", get(download_zip))
}

fn to_response(row: FileWithUser) -> FileResponse {
    FileResponse {
        id: row.id,
        event_id: row.event_id,
        user_id: row.user_id,
        url: row.url,
        filename: row.filename,
        uploaded_at: row.uploaded_at,
        user: UserRef {
            id: row.user_id,
            name: row.user_name,
        },
    }
}

#[instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let rows = repo::list_for_event(&state.db, event_id).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

#[instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(event_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
    if Event::find_by_id(&state.db, event_id).await?.is_none() {
        return Err(ApiError::NotFound("Event"));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("file").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("failed to read upload: {e}")))?;
            upload = Some((filename, content_type, data));
            break;
        }
    }
    let (filename, content_type, data) =
        upload.ok_or_else(|| ApiError::validation("multipart field 'file' is required"))?;
    if data.is_empty() {
        return Err(ApiError::validation("uploaded file is empty"));
    }

    let row = persist_upload(&state, event_id, actor.id, &filename, &content_type, data).await?;
    info!(file_id = %row.id, event_id = %event_id, "file uploaded");
    let response = to_response(row);

    let payload = WsOutboundEvent::FileUploaded(
        serde_json::to_value(&response).map_err(anyhow::Error::from)?,
    );
    state.realtime.publish_to_event(event_id, &payload).await;

    fanout::spawn(
        state.clone(),
        event_id,
        UserRef {
            id: actor.id,
            name: actor.name,
        },
        NotificationCategory::File,
    );

    Ok(Json(response))
}

/// Store the object, then record it. If the insert fails the stored object
/// is removed again so nothing is left orphaned in the bucket.
pub(crate) async fn persist_upload(
    state: &AppState,
    event_id: Uuid,
    user_id: Uuid,
    filename: &str,
    content_type: &str,
    data: bytes::Bytes,
) -> Result<FileWithUser, ApiError> {
    let key = services::object_key(event_id, filename);
    let stored = state.storage.put_object(&key, data, content_type).await?;

    match repo::insert(
        &state.db,
        event_id,
        user_id,
        &stored.url,
        &stored.key,
        filename,
    )
    .await
    {
        Ok(row) => Ok(row),
        Err(e) => {
            if let Err(del) = state.storage.delete_object(&stored.key).await {
                warn!(key = %stored.key, error = %del, "failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let file = repo::find_by_id(&state.db, file_id)
        .await?
        .ok_or(ApiError::NotFound("File"))?;
    if file.user_id != actor.id {
        return Err(ApiError::Forbidden);
    }

    state.storage.delete_object(&file.provider_id).await?;
    repo::delete(&state.db, file_id).await?;
    info!(file_id = %file_id, "file deleted");

    state
        .realtime
        .publish_to_event(
            file.event_id,
            &WsOutboundEvent::FileDeleted {
                file_id,
                event_id: file.event_id,
            },
        )
        .await;

    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// Bundles every attachment of an event into one archive. Objects the
/// provider can no longer serve are skipped rather than failing the export.
#[instrument(skip(state))]
pub async fn download_zip(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = Event::find_by_id(&state.db, event_id)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;
    let rows = repo::list_for_event(&state.db, event_id).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("Files"));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        match state.storage.get_object(&row.provider_id).await {
            Ok(bytes) => entries.push((row.filename, bytes)),
            Err(e) => {
                warn!(file_id = %row.id, error = %e, "skipping unfetchable file in export");
            }
        }
    }

    let archive = services::build_zip(&entries)?;
    let disposition = format!("attachment; filename=\"{}.zip\"", event.id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    ))
}
