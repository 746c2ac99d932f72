//! Server Module
//!
//! HTTP surface of the service: the accept loop and the three endpoints
//! (`/`, `/random-image`, `/stats`). Every externally observable failure
//! degrades to a JSON error body with a not-found status; nothing here is
//! fatal to the process.

use crate::config::Config;
use crate::selector::{content_type_for, ImageSelector};
use crate::shutdown::ShutdownSignal;
use crate::stats::StatsStore;
use crate::{ApiError, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// HTTP server for the random image API
pub struct ApiServer {
    addr: SocketAddr,
    state: RouterState,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, config: &Config, stats: StatsStore) -> Self {
        let state = RouterState::new(
            ImageSelector::new(config.storage.image_dir()),
            stats,
            config.storage.data_file().display().to_string(),
        );
        Self { addr, state }
    }

    /// Run the accept loop until the shutdown signal fires.
    ///
    /// One task per connection; the host runtime's connection handling is
    /// the only bound on concurrency.
    pub async fn start(&self, mut shutdown_signal: ShutdownSignal) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            ApiError::IoError(format!("Failed to bind server on {}: {}", self.addr, e))
        })?;

        info!("API server listening on {}", self.addr);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, remote_addr)) => {
                            debug!("Accepting connection from {}", remote_addr);
                            let io = TokioIo::new(stream);
                            let state = self.state.clone();

                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let state = state.clone();
                                    async move { state.handle_request(req).await }
                                });

                                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                    if !e.to_string().contains("connection closed") {
                                        error!("Error serving connection: {}", e);
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        }
                    }
                }
                _ = shutdown_signal.wait_for_shutdown() => {
                    info!("API server received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Cloneable per-request handler state
#[derive(Clone)]
pub struct RouterState {
    selector: ImageSelector,
    stats: StatsStore,
    data_file: String,
}

impl RouterState {
    pub fn new(selector: ImageSelector, stats: StatsStore, data_file: String) -> Self {
        Self {
            selector,
            stats,
            data_file,
        }
    }

    async fn handle_request(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>> {
        let path = req.uri().path().to_string();
        debug!("Request: {} {}", req.method(), path);
        self.route(&path).await
    }

    /// Dispatch a request by path. Methods are implicitly GET-only; no
    /// method validation is performed.
    pub async fn route(&self, path: &str) -> Result<Response<Full<Bytes>>> {
        match path {
            "/random-image" => self.handle_random_image().await,
            "/stats" => self.handle_stats().await,
            // The info handler answers the exact root path only
            "/" => self.handle_info().await,
            _ => not_found_response(),
        }
    }

    /// Serve one randomly chosen image.
    ///
    /// The counter is incremented before the body is read, so an interrupted
    /// transfer still counts.
    async fn handle_random_image(&self) -> Result<Response<Full<Bytes>>> {
        let (name, path) = match self.selector.pick() {
            Ok(picked) => picked,
            Err(e) => return self.error_response(&e),
        };

        self.stats.record(&name).await;

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                // Picked file vanished between the scan and the read
                let err = ApiError::IoError(format!(
                    "failed to read image file {}: {}",
                    path.display(),
                    e
                ));
                return self.error_response(&err);
            }
        };

        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", content_type_for(&name))
            .body(Full::new(Bytes::from(contents)))
            .map_err(|e| ApiError::HttpError(format!("Failed to build image response: {}", e)))
    }

    /// Report the current counters. Read-only, cannot fail observably.
    async fn handle_stats(&self) -> Result<Response<Full<Bytes>>> {
        let snapshot = self.stats.snapshot().await;
        let body = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ApiError::SerializationError(format!("Failed to serialize stats: {}", e)))?;
        json_response(StatusCode::OK, body)
    }

    /// Service info. Probes the image directory with a best-effort pick so
    /// obvious misconfiguration shows up here; probe errors are swallowed.
    async fn handle_info(&self) -> Result<Response<Full<Bytes>>> {
        let image_count = match self.selector.pick() {
            Ok(_) => self.selector.count_files(),
            Err(_) => 0,
        };

        let body = serde_json::json!({
            "message": "Random Image API",
            "endpoints": {
                "random_image": "/random-image",
                "stats": "/stats",
            },
            "image_dir": self.selector.image_dir().display().to_string(),
            "data_file": self.data_file,
            "image_count": image_count,
            "status": "ready",
        });

        json_response(StatusCode::OK, body.to_string())
    }

    /// Error-shaped JSON body naming the configured directory for diagnosis
    fn error_response(&self, err: &ApiError) -> Result<Response<Full<Bytes>>> {
        let body = serde_json::json!({
            "error": err.to_string(),
            "image_dir": self.selector.image_dir().display().to_string(),
        });
        json_response(StatusCode::NOT_FOUND, body.to_string())
    }
}

fn json_response(status: StatusCode, body: String) -> Result<Response<Full<Bytes>>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| ApiError::HttpError(format!("Failed to build response: {}", e)))
}

fn not_found_response() -> Result<Response<Full<Bytes>>> {
    json_response(
        StatusCode::NOT_FOUND,
        serde_json::json!({ "error": "not found" }).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn test_state(temp_dir: &TempDir) -> RouterState {
        let image_dir = temp_dir.path().join("resources");
        std::fs::create_dir_all(&image_dir).unwrap();
        let data_file = temp_dir.path().join("data.json");
        RouterState::new(
            ImageSelector::new(image_dir),
            StatsStore::new(data_file.clone()),
            data_file.display().to_string(),
        )
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let response = state.route("/favicon.ico").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_before_any_request() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let response = state.route("/stats").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total_requests"], 0);
        assert!(body["image_counts"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_random_image_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let response = state.route("/random-image").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("no image files"));
        assert!(body["image_dir"].as_str().unwrap().contains("resources"));
    }

    #[tokio::test]
    async fn test_random_image_serves_bytes_and_counts() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        std::fs::write(
            temp_dir.path().join("resources").join("only.png"),
            b"png-bytes",
        )
        .unwrap();

        let response = state.route("/random-image").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "image/png"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"png-bytes");

        let stats = state.stats.snapshot().await;
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.image_counts["only.png"], 1);
    }

    #[tokio::test]
    async fn test_info_endpoint_shape() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        std::fs::write(temp_dir.path().join("resources").join("a.jpg"), b"j").unwrap();

        let response = state.route("/").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["endpoints"]["random_image"], "/random-image");
        assert_eq!(body["endpoints"]["stats"], "/stats");
        assert_eq!(body["image_count"], 1);
    }

    #[tokio::test]
    async fn test_info_endpoint_never_fails_on_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let data_file = temp_dir.path().join("data.json");
        let state = RouterState::new(
            ImageSelector::new(temp_dir.path().join("gone")),
            StatsStore::new(data_file.clone()),
            data_file.display().to_string(),
        );

        let response = state.route("/").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["image_count"], 0);
        assert_eq!(body["status"], "ready");
    }
}
