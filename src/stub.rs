//! In-process stub of the Rosco connection endpoints.
//!
//! Answers like the real service does: the body is always the connection
//! status, and the HTTP status tells how the request went (`200` done, `208`
//! nothing to do, `503` the ECU did not answer). No serial port is touched;
//! the ECU's behaviour is scripted through [`StubOptions`].

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::Arc,
    thread::JoinHandle,
};
use tokio::sync::oneshot;

use crate::config::{EcuBehaviour, StubConfig};

/// Connection status reported by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcuStatus {
    #[serde(rename = "Connected")]
    pub connected: bool,
    #[serde(rename = "Initialised")]
    pub initialised: bool,
    #[serde(rename = "ECUID")]
    pub ecu_id: String,
    #[serde(rename = "IACPosition")]
    pub iac_position: i32,
}

/// Scripted ECU behaviour.
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    pub behaviour: EcuBehaviour,
    pub ecu_id: String,
    pub iac_position: i32,
    /// Raw text returned by every connect call instead of the status.
    pub connect_body: Option<String>,
}

impl From<&StubConfig> for StubOptions {
    fn from(cfg: &StubConfig) -> Self {
        Self {
            behaviour: cfg.behaviour,
            ecu_id: cfg.ecu_id.clone(),
            iac_position: cfg.iac_position,
            connect_body: None,
        }
    }
}

/// Which endpoint a recorded request hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Connect,
    Disconnect,
}

/// A request as received by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRequest {
    pub endpoint: Endpoint,
    /// `Port` field of the body, empty if absent or unparsable
    pub port: String,
    /// Body exactly as received
    pub raw: String,
}

#[derive(Debug, Default, Deserialize)]
struct PortBody {
    #[serde(rename = "Port", alias = "port", default)]
    port: String,
}

#[derive(Debug, Default)]
struct StubState {
    options: StubOptions,
    status: EcuStatus,
    requests: Vec<StubRequest>,
}

type Shared = Arc<Mutex<StubState>>;

// ---------- Router Builder ----------
fn build_router(shared: Shared) -> Router {
    Router::new()
        .route("/rosco", get(get_status))
        .route("/rosco/connect", post(post_connect))
        .route("/rosco/disconnect", post(post_disconnect))
        .with_state(shared)
}

// ---------- Handlers ----------
async fn get_status(State(shared): State<Shared>) -> Json<EcuStatus> {
    Json(shared.lock().status.clone())
}

async fn post_connect(State(shared): State<Shared>, body: String) -> Response {
    let mut state = shared.lock();
    let port = record(&mut state, Endpoint::Connect, body);
    tracing::info!(%port, "stub connect");

    if let Some(raw) = state.options.connect_body.clone() {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=UTF-8")],
            raw,
        )
            .into_response();
    }

    if state.status.connected {
        tracing::warn!("stub already connected to the ecu");
        return (StatusCode::ALREADY_REPORTED, Json(state.status.clone())).into_response();
    }

    let (connected, initialised) = match state.options.behaviour {
        EcuBehaviour::Responsive => (true, true),
        EcuBehaviour::ConnectOnly => (true, false),
        EcuBehaviour::NoResponse => (false, false),
    };
    let status = if initialised {
        EcuStatus {
            connected,
            initialised,
            ecu_id: state.options.ecu_id.clone(),
            iac_position: state.options.iac_position,
        }
    } else {
        EcuStatus {
            connected,
            ..Default::default()
        }
    };
    state.status = status;

    let code = if connected {
        StatusCode::OK
    } else {
        tracing::warn!(%port, "stub unable to connect to the ecu");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(state.status.clone())).into_response()
}

async fn post_disconnect(State(shared): State<Shared>, body: String) -> Response {
    let mut state = shared.lock();
    let port = record(&mut state, Endpoint::Disconnect, body);
    tracing::info!(%port, "stub disconnect");

    if !state.status.connected {
        return (StatusCode::ALREADY_REPORTED, Json(state.status.clone())).into_response();
    }
    state.status = EcuStatus::default();
    (StatusCode::OK, Json(state.status.clone())).into_response()
}

fn record(state: &mut StubState, endpoint: Endpoint, raw: String) -> String {
    let port = serde_json::from_str::<PortBody>(&raw)
        .unwrap_or_default()
        .port;
    state.requests.push(StubRequest {
        endpoint,
        port: port.clone(),
        raw,
    });
    port
}

/// Serve the stub on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, options: StubOptions, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shared = Arc::new(Mutex::new(StubState {
        options,
        ..Default::default()
    }));
    axum::serve(listener, build_router(shared))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Stub running on a dedicated thread with its own runtime.
///
/// Blocking callers on any thread can use it. Dropping the handle stops the
/// server and joins the thread.
pub struct StubServer {
    addr: SocketAddr,
    shared: Shared,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl StubServer {
    /// Bind `addr` (use port 0 for an ephemeral port) and start serving.
    pub fn spawn(addr: SocketAddr, options: StubOptions) -> io::Result<Self> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Mutex::new(StubState {
            options,
            ..Default::default()
        }));
        let router = build_router(Arc::clone(&shared));
        let (tx_shutdown, rx_shutdown) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("rosco-stub".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()?;
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)?;
                    axum::serve(listener, router)
                        .with_graceful_shutdown(async {
                            let _ = rx_shutdown.await;
                        })
                        .await
                })
            })?;

        tracing::debug!(%addr, "stub service started");
        Ok(Self {
            addr,
            shared,
            shutdown: Some(tx_shutdown),
            thread: Some(thread),
        })
    }

    /// Start on an ephemeral loopback port.
    pub fn spawn_local(options: StubOptions) -> io::Result<Self> {
        Self::spawn(SocketAddr::from(([127, 0, 0, 1], 0)), options)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL to hand to a [`RoscoClient`](crate::client::RoscoClient).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.shared.lock().requests.clone()
    }

    pub fn status(&self) -> EcuStatus {
        self.shared.lock().status.clone()
    }

    pub fn set_behaviour(&self, behaviour: EcuBehaviour) {
        self.shared.lock().options.behaviour = behaviour;
    }

    /// Replace every connect answer with `body`, or restore normal answers.
    pub fn set_connect_body(&self, body: Option<String>) {
        self.shared.lock().options.connect_body = body;
    }

    /// Forget recorded requests and return to the disconnected state.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.requests.clear();
        state.status = EcuStatus::default();
    }
}

impl std::fmt::Debug for StubServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubServer").field("addr", &self.addr).finish()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("stub service exited with error: {e}"),
                Err(_) => tracing::warn!("stub service thread panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(behaviour: EcuBehaviour) -> StubOptions {
        StubOptions {
            behaviour,
            ecu_id: "99 00 03 03".to_string(),
            iac_position: 30,
            connect_body: None,
        }
    }

    fn post(url: &str, port: &str) -> (u16, EcuStatus) {
        let response = match ureq::post(url).send_json(serde_json::json!({ "Port": port })) {
            Ok(r) => r,
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => panic!("transport failure: {e}"),
        };
        let code = response.status();
        (code, response.into_json().unwrap())
    }

    #[test]
    fn responsive_ecu_connects_then_reports_already_connected() {
        let stub = StubServer::spawn_local(options(EcuBehaviour::Responsive)).unwrap();
        let url = format!("{}/rosco/connect", stub.base_url());

        let (code, status) = post(&url, "COM3");
        assert_eq!(code, 200);
        assert!(status.connected && status.initialised);
        assert_eq!(status.ecu_id, "99 00 03 03");

        let (code, _) = post(&url, "COM3");
        assert_eq!(code, 208);
    }

    #[test]
    fn unresponsive_ecu_yields_service_unavailable() {
        let stub = StubServer::spawn_local(options(EcuBehaviour::NoResponse)).unwrap();
        let (code, status) = post(&format!("{}/rosco/connect", stub.base_url()), "COM9");
        assert_eq!(code, 503);
        assert!(!status.connected);
    }

    #[test]
    fn disconnect_resets_status_and_records_ports() {
        let stub = StubServer::spawn_local(options(EcuBehaviour::ConnectOnly)).unwrap();
        let base = stub.base_url();

        let (code, _) = post(&format!("{base}/rosco/disconnect"), "COM1");
        assert_eq!(code, 208);

        post(&format!("{base}/rosco/connect"), "COM2");
        assert!(stub.status().connected);
        assert!(!stub.status().initialised);

        let (code, status) = post(&format!("{base}/rosco/disconnect"), "COM2");
        assert_eq!(code, 200);
        assert_eq!(status, EcuStatus::default());

        let ports: Vec<_> = stub
            .requests()
            .into_iter()
            .map(|r| (r.endpoint, r.port))
            .collect();
        assert_eq!(
            ports,
            vec![
                (Endpoint::Disconnect, "COM1".to_string()),
                (Endpoint::Connect, "COM2".to_string()),
                (Endpoint::Disconnect, "COM2".to_string()),
            ]
        );
    }

    #[test]
    fn status_endpoint_serialises_wire_names() {
        let stub = StubServer::spawn_local(options(EcuBehaviour::Responsive)).unwrap();
        let body: serde_json::Value = ureq::get(&format!("{}/rosco", stub.base_url()))
            .call()
            .unwrap()
            .into_json()
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "Connected": false,
                "Initialised": false,
                "ECUID": "",
                "IACPosition": 0
            })
        );
    }
}
