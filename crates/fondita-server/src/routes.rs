//! HTTP handlers.

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, State},
};
use fondita_application::SyncStatus;
use fondita_core::menu::MenuDocument;
use fondita_core::publish::PublishOutcome;
use fondita_core::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Multipart field names accepted for the uploaded file.
const FILE_FIELDS: &[&str] = &["imagen", "image", "file"];
const OLD_FILENAME_FIELD: &str = "oldFilename";

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    token: String,
    username: String,
    expires_in_seconds: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    success: bool,
    saved: bool,
    published: bool,
    state: &'static str,
    message: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    valid: bool,
    username: String,
    expires_in_seconds: i64,
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("JSON inválido: {}", e)))
}

/// Accepts the document bare or wrapped as `{"menuData": ...}`.
fn parse_menu(body: &[u8]) -> Result<MenuDocument, ApiError> {
    let mut value: Value = parse_json(body)?;
    if let Some(inner) = value.get_mut("menuData") {
        value = inner.take();
    }
    if !value.is_object() {
        return Err(ApiError::bad_request("El menú debe ser un objeto JSON"));
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::bad_request(format!("Menú inválido: {}", e)))
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<LoginResponse> {
    let request: LoginRequest = parse_json(&body)?;
    let session = state.auth.login(&request.username, &request.password).await?;
    tracing::info!(username = %session.username, "Admin logged in");

    Ok(Json(LoginResponse {
        expires_in_seconds: state.auth.expires_in_seconds(&session),
        token: session.token,
        username: session.username,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<Value> {
    state.auth.logout(&token).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn get_menu(State(state): State<AppState>) -> ApiResult<MenuDocument> {
    Ok(Json(state.menu.load_or_default().await?))
}

/// Saves and queues replication in the background.
pub async fn save_menu(State(state): State<AppState>, body: Bytes) -> ApiResult<SaveResponse> {
    let document = parse_menu(&body)?;
    let saved = state.menu.save(document).await?;
    state.scheduler.trigger().await;

    let message = if state.scheduler.is_enabled() {
        "Menú guardado. La publicación se realizará en segundo plano."
    } else {
        "Menú guardado. La publicación automática está desactivada."
    };
    Ok(Json(SaveResponse {
        success: true,
        saved: true,
        published: false,
        state: "queued",
        message: message.to_string(),
        version: saved.version(),
        commit: None,
        error: None,
    }))
}

/// Saves and publishes before answering.
///
/// A failed publication still answers 200: the save itself succeeded.
pub async fn save_and_sync(State(state): State<AppState>, body: Bytes) -> ApiResult<SaveResponse> {
    let document = parse_menu(&body)?;
    let saved = state.menu.save(document).await?;
    let version = saved.version();

    let response = match state.scheduler.run_now().await {
        Ok(report) => match report.outcome {
            PublishOutcome::Published { commit } => SaveResponse {
                success: true,
                saved: true,
                published: true,
                state: "published",
                message: "Menú guardado y publicado.".to_string(),
                version,
                commit: Some(commit),
                error: None,
            },
            PublishOutcome::NoChanges => SaveResponse {
                success: true,
                saved: true,
                published: false,
                state: "noChanges",
                message: "Menú guardado. No había cambios que publicar.".to_string(),
                version,
                commit: None,
                error: None,
            },
        },
        Err(e) => {
            tracing::warn!(error = %e, "Menu saved but not published");
            SaveResponse {
                success: true,
                saved: true,
                published: false,
                state: "failed",
                message: "Menú guardado, pero no se pudo publicar.".to_string(),
                version,
                commit: None,
                error: Some(e.to_string()),
            }
        }
    };
    Ok(Json(response))
}

struct Upload {
    bytes: Bytes,
    name: String,
    mime: String,
}

pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let mut upload: Option<Upload> = None;
    let mut old_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if FILE_FIELDS.contains(&field_name.as_str()) && upload.is_none() {
            let name = field.file_name().unwrap_or_default().to_string();
            let mime = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            upload = Some(Upload { bytes, name, mime });
        } else if field_name == OLD_FILENAME_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            old_filename = Some(text.trim().to_string()).filter(|s| !s.is_empty());
        }
    }

    let Some(upload) = upload else {
        return Err(ApiError::bad_request("No se recibió ninguna imagen"));
    };

    let filename = state
        .images
        .put(&upload.bytes, &upload.name, &upload.mime)
        .await?;
    tracing::info!(filename = %filename, size = upload.bytes.len(), "Image uploaded");

    if let Some(old) = old_filename.filter(|old| *old != filename) {
        // Best effort; the upload itself already succeeded
        if let Err(e) = state.images.remove(&old).await {
            tracing::warn!(filename = %old, error = %e, "Could not remove replaced image");
        }
    }

    Ok(Json(json!({ "filename": filename })))
}

pub async fn check_session(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<SessionInfo> {
    Json(SessionInfo {
        valid: true,
        expires_in_seconds: state.auth.expires_in_seconds(&session),
        username: session.username,
    })
}

pub async fn version(State(state): State<AppState>) -> ApiResult<Value> {
    let version = state.menu.current_version().await?;
    Ok(Json(json!({ "version": version })))
}

pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.scheduler.status().await)
}
