use crate::config::Config;
use crate::db::Db;
use crate::error::{Result, RelgraphError};
use crate::graph::{GraphQuery, GraphService};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// HTTP front end for graph queries
pub struct HttpServer {
    service: GraphService,
}

impl HttpServer {
    pub fn new(db: Db, config: Arc<Config>) -> Self {
        Self {
            service: GraphService::new(db, config),
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting graph server on http://{}", addr);
        log::info!("Graph endpoint: http://{}/graph", addr);

        if !check_port_available(port).await {
            return Err(RelgraphError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        axum::serve(listener, app).await.map_err(|e| {
            RelgraphError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        let allowed_origins = &self.service.config().http_server.allowed_origins;

        // No configured origins: allow any (local dev).
        let cors = if allowed_origins.is_empty() {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/graph", get(handle_graph))
            .route("/sources", get(handle_sources))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.service.clone())
    }
}

fn error_response(err: RelgraphError) -> Response {
    let status = match err {
        RelgraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Graph request failed: {}", err);
    }
    (
        status,
        Json(serde_json::json!({
            "error": if status.is_client_error() { "Invalid request" } else { "Internal server error" },
            "details": err.to_string()
        })),
    )
        .into_response()
}

/// Build, filter and serialize a graph for the query-string parameters
async fn handle_graph(
    State(service): State<GraphService>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = match GraphQuery::from_params(&params, &service.config().graph) {
        Ok(q) => q,
        Err(e) => return error_response(e),
    };

    match service.query(query).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => error_response(e),
    }
}

/// List configured edge sources (for building `ignore_ttype` pickers)
async fn handle_sources(State(service): State<GraphService>) -> Response {
    let sources: Vec<serde_json::Value> = service
        .config()
        .sources
        .iter()
        .map(|s| {
            serde_json::json!({
                "table": s.table,
                "foreign_table": s.foreign_table,
                "attrs": s.attrs,
                "taggable": s.tags_jct_table.is_some(),
            })
        })
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "sources": sources }))).into_response()
}

/// Handle health check endpoint
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "relgraph",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::loader::tests::{seed_people, tagged_source};
    use axum::body::Body;
    use axum::http::Request;
    use rusqlite::Connection;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn server(temp_dir: &TempDir) -> HttpServer {
        let db_path = temp_dir.path().join("people.db");
        seed_people(&Connection::open(&db_path).unwrap());
        let mut config = crate::config::tests::sample_config(&db_path);
        config.sources = vec![tagged_source()];
        HttpServer::new(Db::new(&db_path), Arc::new(config))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_graph_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let router = server(&temp_dir).router();

        let (status, body) = get_json(router, "/graph?src=ada&target=dee&cutoff=100&ignore=bob").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["cutoff"], 7);
        assert_eq!(body["meta"]["target"], "dee");
        let ids: Vec<&str> = body["elements"]["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["data"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["ada", "cy", "dee"]);
    }

    #[tokio::test]
    async fn test_bad_parameter_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let router = server(&temp_dir).router();
        let (status, body) = get_json(router, "/graph?dist=far&src=ada").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("dist"));
    }

    #[tokio::test]
    async fn test_non_positive_weight_factor_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let server = server(&temp_dir);
        for uri in [
            "/graph?weightfactor=0&src=ada&target=dee&shortest_only=true&no_ignore_weights=true",
            "/graph?weightfactor=-1&src=ada&target=dee&shortest_only=true&no_ignore_weights=true",
        ] {
            let (status, body) = get_json(server.router(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["details"].as_str().unwrap().contains("weightfactor"));
        }
    }

    #[tokio::test]
    async fn test_sources_and_health() {
        let temp_dir = TempDir::new().unwrap();
        let server = server(&temp_dir);

        let (status, body) = get_json(server.router(), "/sources").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"][0]["table"], "closeness");
        assert_eq!(body["sources"][0]["taggable"], true);

        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
