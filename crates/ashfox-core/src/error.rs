//! The tool error taxonomy and response envelope.
//!
//! Every dispatched tool call resolves to exactly one [`ToolResponse`]; the
//! dispatcher never propagates a Rust panic or an untyped error to a caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable error code returned on the envelope's `error.code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Shape/constraint violation in the request payload.
    InvalidPayload,
    /// A precondition failed: no active project, lock held, authorization denied,
    /// missing MCP context, or unsupported in this profile.
    InvalidState,
    /// Dedicated code for an `ifRevision` guard mismatch.
    InvalidStateRevisionMismatch,
    /// The backend or codec cannot perform the requested operation.
    UnsupportedFormat,
    /// The operation is recognized but not implemented by the selected backend.
    NotImplemented,
    /// The operation was a no-op (e.g. texture content unchanged).
    NoChange,
    /// A persistence or transport port failed.
    IoError,
    /// Catch-all; must never leak a stack trace or internal detail.
    Unknown,
}

impl ErrorCode {
    /// Stable wire string, matching the `snake_case` serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::InvalidState => "invalid_state",
            Self::InvalidStateRevisionMismatch => "invalid_state_revision_mismatch",
            Self::UnsupportedFormat => "unsupported_format",
            Self::NotImplemented => "not_implemented",
            Self::NoChange => "no_change",
            Self::IoError => "io_error",
            Self::Unknown => "unknown",
        }
    }
}

/// A typed, user-facing tool error.
///
/// `details.reason` carries a machine-readable sub-code (e.g.
/// `project_locked`, `forbidden_workspace_folder_write`) whenever one applies;
/// callers should match on `reason`, not on `message`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ToolError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable message. Never a stack trace.
    pub message: String,
    /// Optional actionable remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    /// Structured details, typically `{"reason": "..."}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    /// Construct a bare error with just a code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fix: None,
            details: None,
        }
    }

    /// Attach a machine-readable `details.reason`.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.details = Some(serde_json::json!({ "reason": reason }));
        self
    }

    /// Attach a remediation hint.
    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// Read back `details.reason` if present.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.details.as_ref()?.get("reason")?.as_str()
    }

    /// Shorthand for `ErrorCode::InvalidPayload`.
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPayload, message)
    }

    /// Shorthand for `ErrorCode::InvalidState`.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    /// Shorthand for `ErrorCode::InvalidState` carrying a `reason`.
    #[must_use]
    pub fn invalid_state_reason(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message).with_reason(reason)
    }

    /// Shorthand for `ErrorCode::InvalidStateRevisionMismatch`.
    #[must_use]
    pub fn revision_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorCode::InvalidStateRevisionMismatch,
            format!("project revision mismatch: expected {expected}, found {actual}"),
        )
    }

    /// Shorthand for `ErrorCode::UnsupportedFormat`.
    #[must_use]
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedFormat, message)
    }

    /// Shorthand for `ErrorCode::IoError`.
    #[must_use]
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoError, message)
    }
}

/// Result type for operations producing a [`ToolError`].
pub type ToolResult<T> = Result<T, ToolError>;

/// The envelope returned by every tool dispatch: `{ok:true, data} | {ok:false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse<T> {
    /// Successful invocation.
    Ok {
        /// Always `true`; present so the tagged shape round-trips through JSON.
        ok: True,
        /// The tool's result payload.
        data: T,
    },
    /// Failed invocation.
    Err {
        /// Always `false`.
        ok: False,
        /// The typed error.
        error: ToolError,
    },
}

impl<T> ToolResponse<T> {
    /// Build a success envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self::Ok { ok: True, data }
    }

    /// Build a failure envelope.
    #[must_use]
    pub fn err(error: ToolError) -> Self {
        Self::Err { ok: False, error }
    }

    /// True iff this is a success envelope.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl<T> From<ToolResult<T>> for ToolResponse<T> {
    fn from(result: ToolResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::err(error),
        }
    }
}

/// Unit type that always serializes to the JSON literal `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct True;

impl Serialize for True {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for True {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = bool::deserialize(d)?;
        if value {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom("expected literal `true`"))
        }
    }
}

/// Unit type that always serializes to the JSON literal `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct False;

impl Serialize for False {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(false)
    }
}

impl<'de> Deserialize<'de> for False {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = bool::deserialize(d)?;
        if value {
            Err(serde::de::Error::custom("expected literal `false`"))
        } else {
            Ok(Self)
        }
    }
}
