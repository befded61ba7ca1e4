//! Blocking HTTP client for the Rosco connection endpoints.
//!
//! The client accepts any HTTP status: the service answers
//! `503 Service Unavailable` and `208 Already Reported` with a normal status
//! body, and the steps assert on that body rather than on the status line.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::context::ResponseBody;
use crate::error::{StepError, StepResult};

/// Base URL of a locally running service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";

pub const CONNECT_PATH: &str = "rosco/connect";
pub const DISCONNECT_PATH: &str = "rosco/disconnect";

/// Request body shared by connect and disconnect.
#[derive(Debug, Serialize)]
pub struct PortRequest<'a> {
    #[serde(rename = "Port")]
    pub port: &'a str,
}

/// Outcome of a connect call: HTTP status plus decoded body.
#[derive(Debug, Clone)]
pub struct ConnectResponse {
    pub status: u16,
    pub body: ResponseBody,
}

/// HTTP client bound to one service base URL.
#[derive(Clone)]
pub struct RoscoClient {
    base: Url,
    agent: ureq::Agent,
}

impl RoscoClient {
    /// Build a client for `base_url`, which must be an absolute http(s) URL.
    pub fn new(base_url: &str) -> StepResult<Self> {
        let invalid = |message: &str| StepError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: message.to_string(),
        };
        let base = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base"));
        }

        // No timeouts: the client default applies, as for any other caller.
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self { base, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of `path` below the base, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POST `{"Port": port}` to the connect endpoint and decode the reply.
    pub fn connect(&self, port: &str) -> StepResult<ConnectResponse> {
        let url = self.endpoint(CONNECT_PATH);
        let response = self.post_port(&url, port)?;
        let status = response.status();

        let text = response
            .into_string()
            .map_err(|e| StepError::decode(&url, e))?;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(StepError::decode(
                    &url,
                    format!("expected an object, got {other}"),
                ))
            }
            Err(e) => return Err(StepError::decode(&url, e)),
        };

        tracing::info!(%url, status, ?body, "connect response");
        Ok(ConnectResponse { status, body })
    }

    /// POST `{"Port": port}` to the disconnect endpoint; the reply is ignored.
    pub fn disconnect(&self, port: &str) -> StepResult<u16> {
        let url = self.endpoint(DISCONNECT_PATH);
        let status = self.post_port(&url, port)?.status();
        tracing::info!(%url, status, "disconnect sent");
        Ok(status)
    }

    fn post_port(&self, url: &str, port: &str) -> StepResult<ureq::Response> {
        tracing::debug!(%url, port, "posting port");
        match self.agent.post(url).send_json(PortRequest { port }) {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(code, response)) => {
                tracing::warn!(%url, code, "service answered with a non-success status");
                Ok(response)
            }
            Err(ureq::Error::Transport(transport)) => Err(StepError::transport(url, transport)),
        }
    }
}

impl std::fmt::Debug for RoscoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoscoClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}
