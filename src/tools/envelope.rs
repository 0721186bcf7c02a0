//! Uniform error envelope returned to the agent in place of a failed tool call.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

use crate::mallory::error::MalloryApiError;

/// Structured error handed back to the calling agent.
///
/// Serializes as `{"error": .., "status_code": .., "type": ..}`; `GeneralError`
/// has no `status_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorEnvelope {
    AuthenticationError { error: String, status_code: u16 },
    ApiError { error: String, status_code: u16 },
    GeneralError { error: String },
}

impl ErrorEnvelope {
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(api_err) = err.downcast_ref::<MalloryApiError>() {
            if let Some(status_code) = api_err.status_code() {
                return Self::from_status(api_err, status_code);
            }
        }

        Self::GeneralError {
            error: describe(err),
        }
    }

    fn from_status(api_err: &MalloryApiError, status_code: u16) -> Self {
        if api_err.is_authentication_error() {
            Self::AuthenticationError {
                error: api_err.to_string(),
                status_code,
            }
        } else {
            Self::ApiError {
                error: api_err.message(),
                status_code,
            }
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthenticationError { status_code, .. } | Self::ApiError { status_code, .. } => {
                Some(*status_code)
            }
            Self::GeneralError { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Null)
    }
}

const UNDESCRIBED_ERROR: &str = "Unexpected error without a description";

/// The error chain joined into one line, never empty and never a backtrace.
/// A cause already quoted by the error above it is not repeated.
fn describe(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string().trim().to_string();
        if text.is_empty() || parts.last().is_some_and(|above| above.contains(&text)) {
            continue;
        }
        parts.push(text);
    }
    if parts.is_empty() {
        UNDESCRIBED_ERROR.to_string()
    } else {
        parts.join(": ")
    }
}

/// What a tool handler hands back once arguments were accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Data(Value),
    Error(ErrorEnvelope),
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }

    pub fn into_call_result(self) -> CallToolResult {
        match self {
            ToolOutput::Data(value) => {
                CallToolResult::success(vec![Content::text(render_json(&value))])
            }
            ToolOutput::Error(envelope) => {
                CallToolResult::error(vec![Content::text(render_json(&envelope.to_json()))])
            }
        }
    }
}

fn render_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Awaits a tool body and converts any failure into an [`ErrorEnvelope`].
///
/// Never fails: upstream errors with a status code become
/// `authentication_error` (401) or `api_error`, everything else `general_error`.
pub async fn with_error_envelope<F>(tool_name: &str, body: F) -> ToolOutput
where
    F: Future<Output = anyhow::Result<Value>>,
{
    match body.await {
        Ok(value) => ToolOutput::Data(value),
        Err(err) => {
            let envelope = ErrorEnvelope::from_error(&err);
            match &envelope {
                ErrorEnvelope::GeneralError { error } => {
                    tracing::error!(tool = tool_name, "Tool failed unexpectedly: {}", error)
                }
                other => tracing::warn!(
                    tool = tool_name,
                    status_code = ?other.status_code(),
                    "Mallory API rejected tool call: {}",
                    err
                ),
            }
            ToolOutput::Error(envelope)
        }
    }
}
