//! HTTP surface
//!
//! warp routes over the dispatch/compositing pipeline. Handlers convert
//! every pipeline error into a JSON error body themselves; the rejection
//! handler only covers transport-level rejections (oversized payloads,
//! wrong methods).

use crate::dispatcher::Dispatcher;
use crate::registry::ModelRegistry;
use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub mod handlers;
pub mod multipart;

/// Upload cap shared by all multipart endpoints.
const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Shared per-process server state.
pub struct AppState {
    /// Boot-time backend registry
    pub registry: Arc<ModelRegistry>,
    /// Dispatch over the registry
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Build server state over a boot-time registry.
    #[must_use]
    pub fn new(registry: ModelRegistry) -> Self {
        let registry = Arc::new(registry);
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        Self {
            registry,
            dispatcher,
        }
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// Build the full route tree.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let service_info = warp::path::end()
        .and(warp::get())
        .and_then(handlers::service_info);

    let models = warp::path("models")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(Arc::clone(&state)))
        .and_then(handlers::list_models);

    let remove = warp::path("remove")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_state(Arc::clone(&state)))
        .and_then(handlers::remove);

    let batch = warp::path("batch")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_state(Arc::clone(&state)))
        .and_then(handlers::batch);

    let compare = warp::path("compare")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_state(state))
        .and_then(handlers::compare);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    service_info
        .or(models)
        .or(remove)
        .or(batch)
        .or(compare)
        .recover(handle_rejection)
        .with(cors)
}

/// Map transport-level rejections to JSON error replies.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message): (StatusCode, String) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".into())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request payload too large".into(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".into())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled rejection: {err:?}"),
        )
    };

    let body = warp::reply::json(&serde_json::json!({ "error": message }));
    Ok(warp::reply::with_status(body, code))
}

/// Serve the API until the process is stopped.
pub async fn serve(state: Arc<AppState>, host: IpAddr, port: u16) {
    let available: Vec<String> = state.registry.available().map(|d| d.id.clone()).collect();
    info!(%host, port, models = ?available, "starting bgremove-api server");
    warp::serve(routes(state)).run((host, port)).await;
}
