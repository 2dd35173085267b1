//! File registry handlers.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use filehub_core::{Backend, FileFilter, FileId, FileKey, FileRecord, MergeStrategy};
use filehub_registry::{BulkResult, Upload};
use serde::Deserialize;

/// Search parameters. `tags` is a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub extension: Option<String>,
    pub tags: Option<String>,
}

/// A record reference in a request body.
#[derive(Debug, Deserialize)]
pub struct RecordRef {
    pub id: i64,
    pub backend: String,
}

impl RecordRef {
    fn key(&self) -> ApiResult<FileKey> {
        Ok(FileKey::new(FileId::new(self.id), self.backend.parse()?))
    }
}

/// Rename request.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Bulk delete request.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub records: Vec<RecordRef>,
}

/// Merge request.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub file1: RecordRef,
    pub file2: RecordRef,
    pub strategy: String,
}

/// Upload parameters; the file content is the raw request body.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: String,
    pub category: Option<String>,
    pub tags: Option<String>,
}

fn split_list(list: Option<&str>) -> Vec<&str> {
    list.map(|list| list.split(',').collect())
        .unwrap_or_default()
}

fn parse_key(backend: &str, id: &str) -> ApiResult<FileKey> {
    let backend: Backend = backend.parse()?;
    let id: FileId = id.parse()?;
    Ok(FileKey::new(id, backend))
}

fn content_type(record: &FileRecord) -> &'static str {
    match record.extension.as_str() {
        "json" => "application/json",
        "txt" | "md" | "csv" | "log" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// GET /api/files - Search both backends.
pub async fn search_files(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<FileRecord>>> {
    let filter = FileFilter::new(
        params.q.as_deref(),
        params.category.as_deref(),
        params.extension.as_deref(),
        split_list(params.tags.as_deref()),
    );
    Ok(Json(state.files.search_files(&filter).await?))
}

/// GET /api/files/{backend}/{id} - Get one record.
pub async fn get_file(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
) -> ApiResult<Json<FileRecord>> {
    let key = parse_key(&backend, &id)?;
    Ok(Json(state.files.get_file(key).await?))
}

/// GET /api/files/{backend}/{id}/content - Download a record's content.
pub async fn get_file_content(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let key = parse_key(&backend, &id)?;
    let (record, data) = state.files.read_content(key).await?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, content_type(&record))], data).into_response())
}

/// PATCH /api/files/{backend}/{id} - Rename a record.
pub async fn rename_file(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<FileRecord>> {
    let key = parse_key(&backend, &id)?;
    Ok(Json(state.files.rename_file(key, &request.name).await?))
}

/// DELETE /api/files/{backend}/{id} - Delete a record and its blob.
pub async fn delete_file(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let key = parse_key(&backend, &id)?;
    state.files.delete_file(key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/files/bulk-delete - Delete many records, isolating failures.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<Json<BulkResult>> {
    let keys = request
        .records
        .iter()
        .map(RecordRef::key)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(state.files.bulk_delete(&keys).await?))
}

/// POST /api/files/merge - Merge two JSON files into a new record.
pub async fn merge_files(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> ApiResult<(StatusCode, Json<FileRecord>)> {
    let first = request.file1.key()?;
    let second = request.file2.key()?;
    let strategy: MergeStrategy = request.strategy.parse()?;

    let record = state.files.merge_files(first, second, strategy).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/files/{backend} - Upload a file into `backend`.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<FileRecord>)> {
    let backend: Backend = backend.parse()?;
    let upload = Upload {
        name: params.name,
        category: params.category,
        tags: split_list(params.tags.as_deref())
            .into_iter()
            .map(str::to_string)
            .collect(),
        data: body,
    };

    let record = state.files.upload(backend, upload).await?;
    tracing::info!(key = %record.key(), size = record.size_bytes, "file uploaded");
    Ok((StatusCode::CREATED, Json(record)))
}
