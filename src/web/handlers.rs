//! HTTP request handlers.

use super::AppState;
use crate::model::SelectedFile;
use crate::views::{UploadError, UploadForm};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use rust_embed::Embed;
use serde::Deserialize;

// ============================================================================
// Templates
// ============================================================================

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");
const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

// ============================================================================
// Page
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let poll_ms = state.config.poll_interval.as_millis().to_string();
    let max_upload = state.dashboard.upload.max_bytes().to_string();

    let content = DASHBOARD_TEMPLATE
        .replace("{{poll_interval_ms}}", &poll_ms)
        .replace("{{max_upload_bytes}}", &max_upload);

    let page = LAYOUT_TEMPLATE
        .replace("{{title}}", "Threat Intelligence Dashboard")
        .replace("{{content}}", &content);

    Html(page)
}

// ============================================================================
// API: Alert views
// ============================================================================

pub async fn handle_table(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.table_view())
}

/// Fetch now and answer with the view as it stands afterwards.
pub async fn handle_table_refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.dashboard.table.refresh().await;
    Json(state.dashboard.table_view())
}

pub async fn handle_chart(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.chart_view())
}

pub async fn handle_chart_refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.dashboard.chart.refresh().await;
    Json(state.dashboard.chart_view())
}

// ============================================================================
// API: Datasets
// ============================================================================

pub async fn handle_datasets(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.datasets.snapshot())
}

pub async fn handle_load_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dashboard.datasets.select(&id).await {
        Ok(loaded) => Json(loaded).into_response(),
        Err(message) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
    }
}

pub async fn handle_local_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let file = match read_file_field(multipart).await {
        Ok(file) => file,
        Err(resp) => return resp,
    };
    let result = state.dashboard.datasets.accept_local_file(file);
    upload_reply(&state.dashboard.upload, result.map(|_| StatusCode::OK))
}

// ============================================================================
// API: Upload form
// ============================================================================

pub async fn handle_upload_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.upload.snapshot())
}

pub async fn handle_upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let file = match read_file_field(multipart).await {
        Ok(file) => file,
        Err(resp) => return resp,
    };
    let result = state.dashboard.upload.select_file(file);
    upload_reply(&state.dashboard.upload, result.map(|_| StatusCode::OK))
}

/// Pointer events over the upload drop zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPhase {
    Enter,
    Over,
    Leave,
}

pub async fn handle_upload_drag(
    State(state): State<AppState>,
    Path(phase): Path<DragPhase>,
) -> impl IntoResponse {
    let form = &state.dashboard.upload;
    match phase {
        DragPhase::Enter => form.drag_enter(),
        DragPhase::Over => form.drag_over(),
        DragPhase::Leave => form.drag_leave(),
    }
    Json(form.snapshot())
}

/// Same as picking a file, but also ends the drag.
pub async fn handle_upload_drop(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let file = match read_file_field(multipart).await {
        Ok(file) => file,
        Err(resp) => {
            state.dashboard.upload.drag_leave();
            return resp;
        }
    };
    let result = state.dashboard.upload.drop_file(file);
    upload_reply(&state.dashboard.upload, result.map(|_| StatusCode::OK))
}

/// Starts the transfer in the background; progress is read via status polls.
pub async fn handle_upload_submit(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.dashboard.upload.start().map(|_| StatusCode::ACCEPTED);
    upload_reply(&state.dashboard.upload, result)
}

pub async fn handle_upload_reset(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.dashboard.upload.reset().map(|_| StatusCode::OK);
    upload_reply(&state.dashboard.upload, result)
}

fn upload_status_code(err: &UploadError) -> StatusCode {
    match err {
        UploadError::Busy => StatusCode::CONFLICT,
        UploadError::NoFile => StatusCode::BAD_REQUEST,
        UploadError::NotCsv | UploadError::TooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Every upload action answers with the form snapshot; the status code says
/// whether the action was taken.
fn upload_reply(form: &UploadForm, result: Result<StatusCode, UploadError>) -> Response {
    let status = match result {
        Ok(status) => status,
        Err(e) => upload_status_code(&e),
    };
    (status, Json(form.snapshot())).into_response()
}

/// Pull the `file` part out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<SelectedFile, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(
                    (StatusCode::BAD_REQUEST, "Missing form field `file`").into_response()
                )
            }
            Err(e) => return Err((e.status(), e.body_text()).into_response()),
        };

        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        return match field.bytes().await {
            Ok(contents) => Ok(SelectedFile::new(name, contents)),
            Err(e) => Err((e.status(), e.body_text()).into_response()),
        };
    }
}

// ============================================================================
// Static
// ============================================================================

pub async fn handle_asset(Path(path): Path<String>) -> impl IntoResponse {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.to_string())],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

pub async fn handle_favicon() -> impl IntoResponse {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <path d="M50 6 L88 20 V48 C88 72 70 88 50 95 C30 88 12 72 12 48 V20 Z" fill="#1f2a44"/>
        <path d="M28 56 L42 42 L54 54 L72 34" stroke="#e5484d" stroke-width="6" fill="none"/>
    </svg>"##;

    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_codes() {
        assert_eq!(upload_status_code(&UploadError::Busy), StatusCode::CONFLICT);
        assert_eq!(upload_status_code(&UploadError::NoFile), StatusCode::BAD_REQUEST);
        assert_eq!(
            upload_status_code(&UploadError::TooLarge { size: 11, limit: 10 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            upload_status_code(&UploadError::NotCsv),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_templates_have_placeholders() {
        assert!(LAYOUT_TEMPLATE.contains("{{content}}"));
        assert!(DASHBOARD_TEMPLATE.contains("{{poll_interval_ms}}"));
        assert!(DASHBOARD_TEMPLATE.contains("{{max_upload_bytes}}"));
    }

    #[test]
    fn test_assets_are_embedded() {
        assert!(Assets::get("dashboard.js").is_some());
        assert!(Assets::get("dashboard.css").is_some());
    }
}
