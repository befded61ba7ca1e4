//! Per-scenario state shared between steps.

use serde_json::{Map, Value};

use crate::error::{StepError, StepResult};

/// Decoded body of the last connect call.
pub type ResponseBody = Map<String, Value>;

/// Mutable record scoped to one scenario.
///
/// A fresh value is created for every scenario and dropped when it ends.
#[derive(Debug, Default, Clone)]
pub struct ScenarioContext {
    port: Option<String>,
    response: Option<ResponseBody>,
    last_status: Option<u16>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the port verbatim, replacing any earlier one.
    pub fn set_port(&mut self, port: impl Into<String>) {
        self.port = Some(port.into());
    }

    pub fn port(&self) -> StepResult<&str> {
        self.port.as_deref().ok_or(StepError::PortNotSet)
    }

    pub fn set_response(&mut self, status: u16, body: ResponseBody) {
        self.last_status = Some(status);
        self.response = Some(body);
    }

    pub fn response(&self) -> StepResult<&ResponseBody> {
        self.response.as_ref().ok_or(StepError::NoResponse)
    }

    /// HTTP status of the last connect call, kept for diagnostics only.
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Look up a response field, failing if it is absent.
    pub fn field(&self, name: &str) -> StepResult<&Value> {
        self.response()?
            .get(name)
            .ok_or_else(|| StepError::MissingField {
                field: name.to_string(),
            })
    }
}
