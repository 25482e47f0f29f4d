use std::collections::{HashMap, HashSet};

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use chrono::Utc;
use common::storage::{BlobStore, BoxReader, ContentHash};
use sea_orm::*;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use super::{find_challenge, find_event};
use crate::entity::challenge_file;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::attachment::AttachmentResponse;
use crate::scoring::window;
use crate::seed::permissions::CHALLENGE_MANAGE;
use crate::state::AppState;

pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    // Room for several files per request plus multipart framing.
    let limit = max_blob_size.saturating_mul(4).saturating_add(64 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Attachments of the given challenges, oldest first, grouped by challenge.
pub(crate) async fn files_by_challenge<C: ConnectionTrait>(
    db: &C,
    challenge_ids: &[i32],
) -> Result<HashMap<i32, Vec<AttachmentResponse>>, DbErr> {
    let mut grouped: HashMap<i32, Vec<AttachmentResponse>> = HashMap::new();
    if challenge_ids.is_empty() {
        return Ok(grouped);
    }
    for file in challenge_file::Entity::find()
        .filter(challenge_file::Column::ChallengeId.is_in(challenge_ids.to_vec()))
        .order_by_asc(challenge_file::Column::CreatedAt)
        .order_by_asc(challenge_file::Column::Id)
        .all(db)
        .await?
    {
        grouped
            .entry(file.challenge_id)
            .or_default()
            .push(AttachmentResponse::from(file));
    }
    Ok(grouped)
}

#[utoipa::path(
    post,
    path = "/{id}/files",
    tag = "Challenge Admin",
    operation_id = "uploadChallengeFiles",
    summary = "Upload challenge attachments",
    description = "Attaches one or more files to a challenge. Every multipart field named \
        `files` (or `file`) carrying a filename is stored. A request stores all of its files \
        or none. Requires `challenge:manage`.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body(content_type = "multipart/form-data", description = "One or more files"),
    responses(
        (status = 201, description = "Attachments created", body = Vec<AttachmentResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(challenge_id))]
pub async fn upload_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;
    find_challenge(&state.db, challenge_id).await?;

    let mut stored = Vec::new();
    let pending = match read_attachments(&state, challenge_id, &mut multipart, &mut stored).await
    {
        Ok(pending) => pending,
        Err(e) => {
            if let Err(cleanup) = release_blobs(&state, stored).await {
                tracing::warn!("Failed to release blobs of a rejected upload: {:?}", cleanup);
            }
            return Err(e);
        }
    };

    if pending.is_empty() {
        return Err(AppError::Validation(
            "No files uploaded. Field name must be 'files'".into(),
        ));
    }

    let txn = state.db.begin().await?;
    let mut created = Vec::with_capacity(pending.len());
    for active in pending {
        let model = active.insert(&txn).await?;
        tracing::info!(challenge_id, file_id = %model.id, size = model.size, "Attachment stored");
        created.push(AttachmentResponse::from(model));
    }
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Store every `files` field and return the rows to insert. Hashes of blobs written so far
/// are pushed to `stored` as they land, so a failed request can release them.
async fn read_attachments(
    state: &AppState,
    challenge_id: i32,
    multipart: &mut Multipart,
    stored: &mut Vec<String>,
) -> Result<Vec<challenge_file::ActiveModel>, AppError> {
    let mut pending = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if !matches!(field.name(), Some("files" | "file")) {
            continue;
        }
        let Some(filename) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| mime_guess::from_path(&filename).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let (hash, size) = stream_field_to_store(
            field,
            &*state.blob_store,
            state.config.storage.max_blob_size,
        )
        .await?;
        stored.push(hash.to_hex());

        pending.push(challenge_file::ActiveModel {
            id: Set(Uuid::now_v7()),
            challenge_id: Set(challenge_id),
            filename: Set(filename),
            content_type: Set(content_type),
            size: Set(size),
            content_hash: Set(hash.to_hex()),
            created_at: Set(Utc::now()),
        });
    }

    Ok(pending)
}

/// Delete each blob that no attachment row references any more.
pub(crate) async fn release_blobs(
    state: &AppState,
    hashes: impl IntoIterator<Item = String>,
) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for hex in hashes {
        if !seen.insert(hex.clone()) {
            continue;
        }
        let still_referenced = challenge_file::Entity::find()
            .filter(challenge_file::Column::ContentHash.eq(&hex))
            .count(&state.db)
            .await?
            > 0;
        if still_referenced {
            continue;
        }
        let hash = ContentHash::from_hex(&hex)?;
        if let Err(e) = state.blob_store.delete(&hash).await {
            tracing::warn!(hash = %hash, "Failed to delete orphaned blob: {}", e);
        }
    }
    Ok(())
}

#[utoipa::path(
    delete,
    path = "/{id}/files/{file_id}",
    tag = "Challenge Admin",
    operation_id = "deleteChallengeFile",
    summary = "Remove a challenge attachment",
    description = "Removes the attachment record. The blob is deleted too unless another \
        attachment shares its content. Requires `challenge:manage`.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("file_id" = String, Path, description = "Attachment ID (UUID)"),
    ),
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Attachment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id, file_id))]
pub async fn delete_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, file_id)): Path<(i32, String)>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;

    let file = find_file(&state.db, &file_id).await?;
    if file.challenge_id != challenge_id {
        return Err(AppError::NotFound("File not found".into()));
    }

    challenge_file::Entity::delete_by_id(file.id)
        .exec(&state.db)
        .await?;
    release_blobs(&state, [file.content_hash]).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{file_id}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download an attachment",
    description = "Streams an attachment. Players may download files of released challenges \
        of the running event and of challenges whose event has ended. `challenge:manage` \
        grants access to every file.",
    params(("file_id" = String, Path, description = "Attachment ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "File not found or not released (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(file_id))]
pub async fn download_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, AppError> {
    let file = find_file(&state.db, &file_id).await?;

    if !auth_user.has_permission(CHALLENGE_MANAGE) {
        let challenge = find_challenge(&state.db, file.challenge_id).await?;
        let event = find_event(&state.db, challenge.event_id).await?;
        let now = Utc::now();
        let released = window::has_ended(&event, now)
            || (window::is_within(now, event.starts_at, event.ends_at)
                && challenge.starts_at <= now);
        if !released {
            return Err(AppError::NotFound("File not found".into()));
        }
    }

    let hash = ContentHash::from_hex(&file.content_hash)?;
    let reader = state.blob_store.get_stream(&hash).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &file.content_type)
        .header(header::CONTENT_LENGTH, file.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&file.filename),
        )
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

async fn find_file<C: ConnectionTrait>(
    db: &C,
    file_id: &str,
) -> Result<challenge_file::Model, AppError> {
    let id =
        Uuid::parse_str(file_id).map_err(|_| AppError::Validation("Invalid file ID".into()))?;
    challenge_file::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))
}

/// Last path component of an uploaded name, without control characters.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 `filename*`.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
                String::from(b as char)
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

/// Spool a multipart field to a temp file, then hand it to the blob store.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    blob_store: &dyn BlobStore,
    max_size: u64,
) -> Result<(ContentHash, i64), AppError> {
    let temp_path = std::env::temp_dir().join(format!("ctf-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }
        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        let (hash, size) = blob_store.put_stream(reader).await?;

        Ok((hash, i64::try_from(size).unwrap_or(i64::MAX)))
    }
    .await;

    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}
