//! HTTP surface: JSON endpoints for each pipeline step plus the UI page.

use crate::app::App;
use crate::upload::MAX_UPLOAD_BYTES;
use crate::{Error, Result};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePromptRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratePromptResponse {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateScenariosRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateScenariosResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub generated_image_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_image))
        .route("/generate-prompt", post(generate_prompt))
        .route("/generate-scenarios", post(generate_scenarios))
        .route("/generate-images", post(generate_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(app: App, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Memify listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(app)))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

fn invalid_json(rejection: JsonRejection) -> Error {
    Error::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
}

fn invalid_multipart(e: MultipartError) -> Error {
    Error::Validation(format!("Invalid upload: {}", e.body_text()))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn upload_image(
    State(app): State<Arc<App>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart
        .map_err(|e| Error::Validation(format!("Invalid upload: {}", e.body_text())))?;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let data = field.bytes().await.map_err(invalid_multipart)?;
        let asset = app.upload_image(&data, &file_name).await?;

        return Ok(Json(UploadResponse {
            image_url: asset.url,
        }));
    }

    Err(Error::Validation("A file field is required".to_string()))
}

async fn generate_prompt(
    State(app): State<Arc<App>>,
    payload: std::result::Result<Json<GeneratePromptRequest>, JsonRejection>,
) -> Result<Json<GeneratePromptResponse>> {
    let Json(request) = payload.map_err(invalid_json)?;
    let prompt = app
        .describe_image(request.image_url.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(GeneratePromptResponse { prompt }))
}

/// Failures here use `{ success: false, message }` rather than `{ error }`.
async fn generate_scenarios(
    State(app): State<Arc<App>>,
    payload: std::result::Result<Json<GenerateScenariosRequest>, JsonRejection>,
) -> Response {
    let result = match payload.map_err(invalid_json) {
        Ok(Json(request)) => {
            app.generate_scenarios(request.prompt.as_deref().unwrap_or_default())
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(scenarios) => Json(GenerateScenariosResponse {
            success: true,
            scenarios: Some(scenarios),
            message: None,
        })
        .into_response(),
        Err(e) => {
            let status = e.status_code();
            tracing::error!("Error generating scenarios: {}", e);
            (
                status,
                Json(GenerateScenariosResponse {
                    success: false,
                    scenarios: None,
                    message: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn generate_images(
    State(app): State<Arc<App>>,
    payload: std::result::Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>> {
    let Json(request) = payload.map_err(invalid_json)?;
    let generated_image_url = app
        .transform_image(
            request.image_url.as_deref().unwrap_or_default(),
            request.scenario.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(GenerateImageResponse {
        generated_image_url,
    }))
}
