use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::device::{RemoteKey, VolumeDirection};
use crate::tv::{AccessoryHooks, InputType, Snapshot};

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    name: String,
}

/// Body of every boolean get/set route
#[derive(Debug, Serialize, Deserialize)]
struct Toggle {
    active: bool,
}

#[derive(Serialize)]
struct InputEntry {
    index: usize,
    name: String,
    #[serde(rename = "type")]
    kind: InputType,
    expose_as_switch: bool,
}

#[derive(Deserialize)]
struct InputRequest {
    index: usize,
}

#[derive(Deserialize)]
struct RemoteRequest {
    key: RemoteKey,
}

#[derive(Deserialize)]
struct VolumeRequest {
    direction: VolumeDirection,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    hooks: Arc<dyn AccessoryHooks>,
    published: watch::Receiver<Snapshot>,
}

impl AppState {
    /// Run an intent on its own task and answer straight away.
    fn accept<F, Fut>(&self, intent: F) -> StatusCode
    where
        F: FnOnce(Arc<dyn AccessoryHooks>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(intent(self.hooks.clone()));
        StatusCode::ACCEPTED
    }

    fn has_input(&self, index: usize) -> bool {
        index < self.hooks.inputs().len()
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            name: state.hooks.name().to_string(),
        }),
    )
}

/// Handler for GET /v1/tv/state. Served from the published snapshot, no device I/O.
async fn tv_state(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.published.borrow().clone())
}

async fn get_power(State(state): State<Arc<AppState>>) -> Json<Toggle> {
    Json(Toggle {
        active: state.hooks.get_power().await,
    })
}

#[tracing::instrument(skip(state))]
async fn set_power(
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<Toggle>,
) -> StatusCode {
    state.accept(|hooks| async move { hooks.set_power(toggle.active).await })
}

async fn get_ambient(State(state): State<Arc<AppState>>) -> Json<Toggle> {
    Json(Toggle {
        active: state.hooks.get_ambient().await,
    })
}

#[tracing::instrument(skip(state))]
async fn set_ambient(
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<Toggle>,
) -> StatusCode {
    state.accept(|hooks| async move { hooks.set_ambient(toggle.active).await })
}

async fn list_inputs(State(state): State<Arc<AppState>>) -> Json<Vec<InputEntry>> {
    Json(
        state
            .hooks
            .inputs()
            .iter()
            .enumerate()
            .map(|(index, input)| InputEntry {
                index,
                name: input.name.clone(),
                kind: input.kind,
                expose_as_switch: input.expose_as_switch,
            })
            .collect(),
    )
}

async fn select_input(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InputRequest>,
) -> StatusCode {
    if !state.has_input(request.index) {
        return StatusCode::NOT_FOUND;
    }
    state.accept(|hooks| async move { hooks.set_active_identifier(request.index).await })
}

async fn set_input_switch(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(toggle): Json<Toggle>,
) -> StatusCode {
    if !state.has_input(index) {
        return StatusCode::NOT_FOUND;
    }
    state.accept(|hooks| async move { hooks.set_input_switch(index, toggle.active).await })
}

async fn remote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RemoteRequest>,
) -> StatusCode {
    state.accept(|hooks| async move { hooks.send_remote_key(request.key).await })
}

async fn volume(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VolumeRequest>,
) -> StatusCode {
    state.accept(|hooks| async move { hooks.adjust_volume(request.direction).await })
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/tv/state", get(tv_state))
        .route("/v1/tv/power", get(get_power).put(set_power))
        .route("/v1/tv/ambient", get(get_ambient).put(set_ambient))
        .route("/v1/tv/inputs", get(list_inputs))
        .route("/v1/tv/input", put(select_input))
        .route("/v1/tv/inputs/:index/switch", put(set_input_switch))
        .route("/v1/tv/remote", post(remote))
        .route("/v1/tv/volume", post(volume))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// This function will bind to the specified address and serve the API endpoints.
/// It will run until the provided shutdown signal is triggered.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `hooks` - The television the set routes drive
/// * `published` - Snapshot receiver kept current by the poller and intents
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
pub async fn serve(
    listen: String,
    port: u16,
    hooks: Arc<dyn AccessoryHooks>,
    published: watch::Receiver<Snapshot>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState {
        version,
        hooks,
        published,
    });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::tv::{InputDescriptor, PowerPhase};

    /// Records every hook call as a string.
    struct FakeHooks {
        inputs: Vec<InputDescriptor>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHooks {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AccessoryHooks for FakeHooks {
        fn name(&self) -> &str {
            "Living Room"
        }

        fn inputs(&self) -> &[InputDescriptor] {
            &self.inputs
        }

        async fn get_power(&self) -> bool {
            self.record("get_power".to_string());
            true
        }

        async fn set_power(&self, on: bool) {
            self.record(format!("set_power({on})"));
        }

        async fn get_ambient(&self) -> bool {
            false
        }

        async fn set_ambient(&self, on: bool) {
            self.record(format!("set_ambient({on})"));
        }

        async fn set_active_identifier(&self, index: usize) {
            self.record(format!("set_active_identifier({index})"));
        }

        async fn send_remote_key(&self, key: RemoteKey) {
            self.record(format!("send_remote_key({key:?})"));
        }

        async fn adjust_volume(&self, direction: VolumeDirection) {
            self.record(format!("adjust_volume({direction:?})"));
        }

        async fn set_input_switch(&self, index: usize, on: bool) {
            self.record(format!("set_input_switch({index}, {on})"));
        }
    }

    fn app() -> (Router, Arc<FakeHooks>, watch::Sender<Snapshot>) {
        let hooks = Arc::new(FakeHooks {
            inputs: vec![InputDescriptor {
                name: "Netflix".to_string(),
                position: 2,
                kind: InputType::App,
                expose_as_switch: true,
            }],
            calls: Mutex::new(Vec::new()),
        });
        let (tx, rx) = watch::channel(Snapshot::default());
        let state = Arc::new(AppState {
            version: "test",
            hooks: hooks.clone(),
            published: rx,
        });
        (create_router(state), hooks, tx)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Spawned intents need a chance to run before we look at the calls.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let (app, _, _) = app();
        let (status, body) = send(app, "GET", "/v1/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_state_reads_published_snapshot() {
        let (app, hooks, tx) = app();
        tx.send_replace(Snapshot {
            power_active: true,
            ambient_active: false,
            phase: PowerPhase::On,
            switching_inputs: [1].into(),
        });

        let (status, body) = send(app, "GET", "/v1/tv/state", None).await;
        assert_eq!(status, StatusCode::OK);
        insta::assert_snapshot!(body, @r#"{"power_active":true,"ambient_active":false,"phase":"on","switching_inputs":[1]}"#);
        assert!(hooks.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_power_asks_device() {
        let (app, hooks, _) = app();
        let (_, body) = send(app, "GET", "/v1/tv/power", None).await;
        assert_eq!(body, r#"{"active":true}"#);
        assert_eq!(*hooks.calls.lock().unwrap(), vec!["get_power"]);
    }

    #[tokio::test]
    async fn test_set_routes_accept_and_run() {
        let (app, hooks, _) = app();

        let requests = [
            ("PUT", "/v1/tv/power", r#"{"active":true}"#),
            ("PUT", "/v1/tv/ambient", r#"{"active":false}"#),
            ("PUT", "/v1/tv/input", r#"{"index":0}"#),
            ("PUT", "/v1/tv/inputs/0/switch", r#"{"active":true}"#),
            ("POST", "/v1/tv/remote", r#"{"key":"arrow_left"}"#),
            ("POST", "/v1/tv/remote", r#"{"key":"power_menu"}"#),
            ("POST", "/v1/tv/volume", r#"{"direction":"increment"}"#),
        ];
        for (method, uri, body) in requests {
            let (status, _) = send(app.clone(), method, uri, Some(body)).await;
            assert_eq!(status, StatusCode::ACCEPTED, "{method} {uri}");
            settle().await;
        }

        assert_eq!(
            *hooks.calls.lock().unwrap(),
            vec![
                "set_power(true)",
                "set_ambient(false)",
                "set_active_identifier(0)",
                "set_input_switch(0, true)",
                "send_remote_key(ArrowLeft)",
                "send_remote_key(Unknown)",
                "adjust_volume(Increment)",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_input_is_not_found() {
        let (app, hooks, _) = app();

        let (status, _) = send(app.clone(), "PUT", "/v1/tv/input", Some(r#"{"index":3}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app, "PUT", "/v1/tv/inputs/3/switch", Some(r#"{"active":true}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        settle().await;
        assert!(hooks.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_inputs() {
        let (app, _, _) = app();
        let (_, body) = send(app, "GET", "/v1/tv/inputs", None).await;
        insta::assert_snapshot!(body, @r#"[{"index":0,"name":"Netflix","type":"app","expose_as_switch":true}]"#);
    }
}
