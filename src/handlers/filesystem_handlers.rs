use crate::error::{AppError, Result};
use crate::services::filesystem_service::FileEntry;
use crate::watch::channel::ChangeChannel;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub struct FilesystemQuery {
    pub op: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub content: String,
}

/// GET /api/filesystem?op=list | ?op=read&file=
pub async fn filesystem_op(
    State(state): State<AppState>,
    Query(query): Query<FilesystemQuery>,
) -> Result<Response> {
    match query.op.as_deref() {
        Some("list") => {
            let files = state.filesystem.list().await?;
            Ok(Json(ListResponse { files }).into_response())
        }
        Some("read") => {
            let file = query
                .file
                .filter(|file| !file.is_empty())
                .ok_or_else(|| AppError::BadRequest("No file specified".to_string()))?;
            let content = state.filesystem.read(&file).await?;
            Ok(Json(ReadResponse { content }).into_response())
        }
        _ => Err(AppError::BadRequest("Invalid op".to_string())),
    }
}

/// GET /api/filesystem/subscribe
///
/// Pushes a `change` event whenever the filesystem root changes, with
/// keep-alive comments in between. The subscription is torn down when the
/// client disconnects and the response body is dropped.
pub async fn subscribe(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let hub = state.watch_hub.clone();
    let root = state.filesystem.root().to_path_buf();
    let lease = tokio::task::spawn_blocking(move || hub.acquire(root))
        .await
        .map_err(|e| AppError::Internal(format!("Watch start task failed: {}", e)))??;
    let frames = ChangeChannel::open(lease, state.config.keep_alive);

    Ok(Sse::new(frames.map(|frame| Ok(frame.to_event()))))
}
