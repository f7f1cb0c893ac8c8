//! Describing one remote operation call.

use crate::error::InvokeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One argument value for a remote operation.
///
/// Arguments render as child elements of the request wrapper in insertion
/// order (document/literal wrapped services validate against schema order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    /// Plain text, XML-escaped when rendered.
    Text(String),
    /// Whole number.
    Int(i64),
    /// Fixed-point number (prices, never floats).
    Decimal(Decimal),
    /// Boolean, rendered as `true`/`false`.
    Bool(bool),
    /// A complex argument with its own ordered child elements.
    Nested(Vec<(String, ArgValue)>),
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<Decimal> for ArgValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// How a recovered field's text is normalized by the tolerant extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, kept verbatim. Text fields identify a record; recovering
    /// one is what lets a damaged response count as answered.
    Text,
    /// Integer; unparseable text normalizes to `"0"`.
    Int,
    /// Decimal number; unparseable text normalizes to `"0"`.
    Decimal,
}

/// A field the caller expects in a response.
///
/// Used only when the strict decoder rejects a body and the tolerant
/// extractor goes hunting; the names are local element names as published
/// by the service, without namespace prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Element name on the wire (local name, no prefix).
    pub name: String,
    /// Normalization applied to the recovered text.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// A free-text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    /// An integer field.
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Int,
        }
    }

    /// A decimal field.
    pub fn decimal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Decimal,
        }
    }
}

/// HTTP Basic credentials, passed explicitly into each invocation.
///
/// The engine keeps no session state; whoever drives it owns credential
/// lifetime and scoping. `Debug` redacts the password so credentials can
/// appear in traces without leaking.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name sent in the `Authorization` header.
    pub username: String,
    /// Plain-text password. Redacted from `Debug` output.
    pub password: String,
}

impl Credentials {
    /// Create credentials from owned or borrowed parts.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single remote operation call: the published operation name, ordered
/// arguments, and the fields worth recovering if the response only
/// survives in damaged form.
///
/// # Examples
///
/// ```
/// use inventario_types::{FieldSpec, OperationCall};
///
/// let call = OperationCall::new("consultarArticulo")
///     .arg("codigo", "MART001")
///     .recover(FieldSpec::text("nombre"))
///     .recover(FieldSpec::decimal("precioVenta"));
/// assert!(call.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationCall {
    /// Operation name as published by the service (e.g. `consultarArticulo`).
    pub operation: String,
    /// Arguments in schema order. Order is preserved on the wire.
    #[serde(default)]
    pub args: Vec<(String, ArgValue)>,
    /// Expected result shape for tolerant recovery. May be empty.
    #[serde(default)]
    pub recovery_fields: Vec<FieldSpec>,
}

impl OperationCall {
    /// Start a call to the named operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            recovery_fields: Vec::new(),
        }
    }

    /// Append one argument. Order is preserved.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    /// Declare one field worth recovering from a damaged response.
    #[must_use]
    pub fn recover(mut self, field: FieldSpec) -> Self {
        self.recovery_fields.push(field);
        self
    }

    /// Declare several recovery fields at once.
    #[must_use]
    pub fn recover_all(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.recovery_fields.extend(fields);
        self
    }

    /// Structural validation, run by the engine before the first attempt.
    ///
    /// A failure here means the call is never dispatched: the outcome
    /// reports zero attempts and a non-retryable error.
    pub fn validate(&self) -> Result<(), InvokeError> {
        if self.operation.trim().is_empty() {
            return Err(InvokeError::InvalidCall("empty operation name".into()));
        }
        if !is_xml_name(&self.operation) {
            return Err(InvokeError::InvalidCall(format!(
                "operation name {:?} is not a valid element name",
                self.operation
            )));
        }
        for (name, value) in &self.args {
            validate_arg(name, value)?;
        }
        for field in &self.recovery_fields {
            if field.name.trim().is_empty() {
                return Err(InvokeError::InvalidCall(
                    "empty recovery field name".into(),
                ));
            }
        }
        Ok(())
    }
}

fn validate_arg(name: &str, value: &ArgValue) -> Result<(), InvokeError> {
    if !is_xml_name(name) {
        return Err(InvokeError::InvalidCall(format!(
            "argument name {name:?} is not a valid element name"
        )));
    }
    if let ArgValue::Nested(children) = value {
        for (child_name, child) in children {
            validate_arg(child_name, child)?;
        }
    }
    Ok(())
}

/// Unprefixed XML element name: ASCII letter or underscore, then letters,
/// digits, `_`, `-`, `.`. Prefixes are the renderer's business, so colons
/// are rejected here.
fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
