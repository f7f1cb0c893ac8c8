//! Classification verdicts and terminal call outcomes.

use crate::error::InvokeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verdict on whether a raw response body arrived whole.
///
/// Computed fresh for every attempt from the body alone; never stored
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// The body carries a closed envelope (or a closed body element).
    Complete,
    /// The body is empty or shows a truncation signal.
    Truncated,
    /// The body is not a SOAP envelope at all.
    NotApplicable,
}

/// A strictly decoded response: the leaf elements under the operation's
/// response wrapper, keyed by local element name, entity-unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDocument {
    /// Operation whose response wrapper was decoded.
    pub operation: String,
    /// Leaf element text keyed by local name. First occurrence wins.
    pub fields: BTreeMap<String, String>,
}

/// What the tolerant extractor salvaged from a body the strict decoder
/// rejected. Pure function of its inputs; two runs over the same body
/// yield the same result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether enough was recovered to treat the call as answered.
    pub success: bool,
    /// Recovered field text keyed by requested field name.
    pub fields: BTreeMap<String, String>,
    /// Server-side message, when one was found.
    pub message: Option<String>,
}

/// A finished call that produced usable data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSuccess {
    /// Operation that was invoked.
    pub operation: String,
    /// Decoded or recovered fields, keyed by local element name.
    pub fields: BTreeMap<String, String>,
    /// Server-side message, when present.
    pub message: Option<String>,
    /// `true` when the data came from tolerant extraction or was salvaged
    /// from an error-status exchange; `false` only for a clean decode of a
    /// success-status response.
    pub recovered_from_raw: bool,
    /// Attempts spent, counting the one that succeeded.
    pub attempts: u32,
}

/// A finished call that produced no usable data.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFailure {
    /// Operation that was invoked.
    pub operation: String,
    /// The error from the last attempt, or the validation error for a
    /// call that was never dispatched.
    pub error: InvokeError,
    /// Attempts actually dispatched. Zero for an invalid call.
    pub attempts: u32,
    /// `true` when every allowed attempt was spent.
    pub attempts_exhausted: bool,
    /// `true` when the last attempt failed on a truncated body.
    pub was_truncated: bool,
}

/// Terminal outcome of an invocation: exactly one of success or failure,
/// owned by the caller. The engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// Usable data was produced.
    Success(CallSuccess),
    /// All attempts failed, or the call never qualified for dispatch.
    Failure(CallFailure),
}

impl InvocationOutcome {
    /// Whether this outcome carries usable data.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success payload, if any.
    pub fn success(&self) -> Option<&CallSuccess> {
        match self {
            Self::Success(s) => Some(s),
            Self::Failure(_) => None,
        }
    }

    /// The failure payload, if any.
    pub fn failure(&self) -> Option<&CallFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f),
        }
    }
}
