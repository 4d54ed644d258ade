use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cluster::Registry;
use crate::error::{Error, Result};
use crate::graph::ResourceNode;

type AppState = State<Arc<Registry>>;

pub struct Api {
    address: String,
    router: Router,
}

impl Api {
    pub async fn start(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.address).await?;
        info!("[API] listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router).await
    }
}

pub fn setup(address: &str, registry: Arc<Registry>, static_dir: Option<PathBuf>) -> Api {
    Api {
        address: address.to_string(),
        router: router(registry, static_dir),
    }
}

pub fn router(registry: Arc<Registry>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/resources.json", get(get_default_resources))
        .route("/clusters", get(list_clusters))
        .route("/clusters/{name}/resources.json", get(get_resources))
        .with_state(registry);
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

async fn get_default_resources(State(registry): AppState) -> Result<Json<ResourceNode>> {
    let graph = registry.default_resource_graph().await?;
    Ok(Json(graph))
}

async fn list_clusters(State(registry): AppState) -> Json<Vec<String>> {
    Json(registry.names())
}

async fn get_resources(
    State(registry): AppState,
    Path(name): Path<String>,
) -> Result<Json<ResourceNode>> {
    let graph = registry.resource_graph(&name).await?;
    info!(
        "[API] served {} ({} nodes, {} cached templates)",
        name,
        graph.children.len(),
        registry.get(&name)?.cached_templates().await
    );
    Ok(Json(graph))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::UnknownCluster(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::Consistency(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("[API] request failed: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
