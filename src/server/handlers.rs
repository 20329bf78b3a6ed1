//! Endpoint handlers
//!
//! Every handler runs the same pipeline shape: collect the multipart form,
//! decode the upload, dispatch segmentation, optionally composite a custom
//! background, and re-encode. Pipeline errors are rendered as JSON bodies
//! with the status the error maps to.

use crate::compositor::{self, BackgroundSpec};
use crate::error::{RemovalError, Result};
use crate::format;
use crate::registry::DEFAULT_MODEL;
use crate::server::multipart::CollectedForm;
use crate::server::AppState;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error};
use warp::http::{header, Response, StatusCode};
use warp::hyper::Body;
use warp::multipart::FormData;
use warp::Reply;

/// Model identifiers run by `/compare`: the two fastest tiers.
const COMPARE_MODELS: [&str; 2] = ["rembg", "rembg-fast"];

#[derive(Serialize)]
struct CompareEntry {
    name: String,
    image: String,
}

/// `GET /` service metadata.
pub async fn service_info() -> std::result::Result<warp::reply::Response, Infallible> {
    let body = serde_json::json!({
        "message": "BgRemove API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/remove": "POST - Remove background from single image",
            "/batch": "POST - Remove background from multiple images",
            "/compare": "POST - Compare the fastest models on one image",
            "/models": "GET - List available models"
        }
    });
    Ok(warp::reply::json(&body).into_response())
}

/// `GET /models` available backend listing.
pub async fn list_models(
    state: Arc<AppState>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    let models: BTreeMap<String, String> = state
        .registry
        .available()
        .map(|d| (d.id.clone(), d.label.clone()))
        .collect();
    Ok(warp::reply::json(&serde_json::json!({ "models": models })).into_response())
}

/// `POST /remove` single-image pipeline.
pub async fn remove(
    form: FormData,
    state: Arc<AppState>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    match remove_inner(form, &state).await {
        Ok(png) => Ok(binary_reply(png, "image/png", None)),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn remove_inner(form: FormData, state: &AppState) -> Result<Vec<u8>> {
    let form = CollectedForm::read(form).await?;
    let file = form.require_file("file")?;
    let model = form.text("model").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let bg_color = form.text("bg_color");
    let bg_image = form.file("bg_image").map(|f| f.data.as_slice());

    let image = decode_image(&file.data)?;
    debug!(model = %model, width = image.width(), height = image.height(), "processing image");

    let spec = BackgroundSpec::from_request(bg_color.as_deref(), bg_image)?;
    let segmented = state.dispatcher.segment(&image, &model).await?;
    let composited = compositor::apply(segmented, spec.as_ref());
    format::encode_png(&composited)
}

/// `POST /batch` multi-image pipeline returning a ZIP archive.
pub async fn batch(
    form: FormData,
    state: Arc<AppState>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    match batch_inner(form, &state).await {
        Ok(archive) => Ok(binary_reply(
            archive,
            "application/zip",
            Some("attachment; filename=batch_results.zip"),
        )),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn batch_inner(form: FormData, state: &AppState) -> Result<Vec<u8>> {
    let form = CollectedForm::read(form).await?;
    let files: Vec<_> = form
        .fields("files")
        .into_iter()
        .filter(|f| !f.data.is_empty())
        .collect();
    if files.is_empty() {
        return Err(RemovalError::invalid_request(
            "missing required file field 'files'",
        ));
    }
    let model = form.text("model").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let spec = BackgroundSpec::from_request(form.text("bg_color").as_deref(), None)?;

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for file in files {
        let image = decode_image(&file.data)?;
        let segmented = state.dispatcher.segment(&image, &model).await?;
        let composited = compositor::apply(segmented, spec.as_ref());
        let png = format::encode_png(&composited)?;

        zip.start_file(format!("removed_{}.png", file.stem()), options)
            .map_err(|e| RemovalError::processing(format!("zip write failed: {e}")))?;
        zip.write_all(&png)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| RemovalError::processing(format!("zip finalize failed: {e}")))?;
    Ok(cursor.into_inner())
}

/// `POST /compare` runs the fastest tiers and returns data-URI results.
pub async fn compare(
    form: FormData,
    state: Arc<AppState>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    match compare_inner(form, &state).await {
        Ok(results) => Ok(warp::reply::json(&results).into_response()),
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn compare_inner(
    form: FormData,
    state: &AppState,
) -> Result<BTreeMap<String, CompareEntry>> {
    let form = CollectedForm::read(form).await?;
    let file = form.require_file("file")?;
    let image = decode_image(&file.data)?;

    let mut results = BTreeMap::new();
    for model in COMPARE_MODELS {
        let segmented = state.dispatcher.segment(&image, model).await?;
        results.insert(
            model.to_string(),
            CompareEntry {
                name: state
                    .registry
                    .label(model)
                    .unwrap_or(model)
                    .to_string(),
                image: format::png_data_uri(&segmented)?,
            },
        );
    }
    Ok(results)
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| RemovalError::decode(e.to_string()))
}

fn binary_reply(bytes: Vec<u8>, content_type: &str, disposition: Option<&str>) -> warp::reply::Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(value) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }
    builder
        .body(Body::from(bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_reply(err: &RemovalError) -> warp::reply::Response {
    error!(error = %err, "request failed");
    let body = warp::reply::json(&serde_json::json!({ "error": err.to_string() }));
    warp::reply::with_status(body, err.status_code()).into_response()
}
