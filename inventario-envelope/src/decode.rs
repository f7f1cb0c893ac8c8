//! Strict response decoding.
//!
//! The primary decode path: refuse anything that does not fully account
//! for itself. A rejection here is not a failure of the call, it merely
//! routes the body to the tolerant extractor, so this decoder is free to
//! be picky. It is strict about what it consumes: the operation's response
//! wrapper must tokenize and balance end to end; markup outside the
//! wrapper only needs to tokenize.

use crate::classify::envelope_opened;
use crate::escape::unescape;
use inventario_types::ResponseDocument;
use std::collections::BTreeMap;

/// Why the strict decoder rejected a body.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No envelope opening marker anywhere in the body.
    #[error("not a soap envelope")]
    NotEnvelope,
    /// The server answered with a SOAP Fault.
    #[error("soap fault: {message}")]
    Fault {
        /// The fault's `faultstring`, or a placeholder when absent.
        message: String,
    },
    /// No `<operationResponse>` wrapper element in the body.
    #[error("missing response wrapper for {operation}")]
    MissingWrapper {
        /// Operation whose wrapper was expected.
        operation: String,
    },
    /// Markup does not tokenize or the wrapper's tags do not balance.
    #[error("malformed xml: {0}")]
    Malformed(String),
}

/// Strictly decode the response for `operation`.
///
/// Finds the `<{operation}Response>` wrapper (bare or under any namespace
/// prefix, exact-case local name) and collects every leaf element beneath
/// it into a flat map keyed by local name, entity-unescaped and trimmed.
/// Nested containers flatten; the first occurrence of a repeated leaf
/// name wins. A SOAP Fault anywhere in the body is a rejection carrying
/// the `faultstring` text.
///
/// # Examples
///
/// ```
/// use inventario_envelope::decode_response;
///
/// let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
///   <soap:Body>
///     <ns2:verificarEstadoResponse xmlns:ns2="http://ws.inventario.ferreteria.com/">
///       <exitoso>true</exitoso>
///       <mensaje>Servicio operativo</mensaje>
///     </ns2:verificarEstadoResponse>
///   </soap:Body>
/// </soap:Envelope>"#;
///
/// let doc = decode_response(body, "verificarEstado").unwrap();
/// assert_eq!(doc.fields["exitoso"], "true");
/// assert_eq!(doc.fields["mensaje"], "Servicio operativo");
/// ```
pub fn decode_response(raw: &str, operation: &str) -> Result<ResponseDocument, DecodeError> {
    if !envelope_opened(&raw.to_ascii_lowercase()) {
        return Err(DecodeError::NotEnvelope);
    }
    let tokens = tokenize(raw)?;
    if let Some(message) = find_fault(&tokens) {
        return Err(DecodeError::Fault { message });
    }
    let fields = decode_wrapper(&tokens, operation)?;
    Ok(ResponseDocument {
        operation: operation.to_owned(),
        fields,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    /// `<name ...>`, full name with its prefix.
    Open(&'a str),
    /// `</name>`
    Close(&'a str),
    /// `<name .../>`
    Empty(&'a str),
    /// Text content, still entity-escaped (CDATA arrives verbatim).
    Text(&'a str),
}

fn tokenize(raw: &str) -> Result<Vec<Token<'_>>, DecodeError> {
    let mut tokens = Vec::new();
    let mut rest = raw;
    loop {
        let Some(pos) = rest.find('<') else {
            if !rest.trim().is_empty() {
                tokens.push(Token::Text(rest));
            }
            break;
        };
        let (text, tail) = rest.split_at(pos);
        if !text.trim().is_empty() {
            tokens.push(Token::Text(text));
        }
        if let Some(after) = tail.strip_prefix("<?") {
            let end = after
                .find("?>")
                .ok_or_else(|| DecodeError::Malformed("unterminated processing instruction".into()))?;
            rest = &after[end + 2..];
        } else if let Some(after) = tail.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| DecodeError::Malformed("unterminated comment".into()))?;
            rest = &after[end + 3..];
        } else if let Some(after) = tail.strip_prefix("<![CDATA[") {
            let end = after
                .find("]]>")
                .ok_or_else(|| DecodeError::Malformed("unterminated cdata section".into()))?;
            tokens.push(Token::Text(&after[..end]));
            rest = &after[end + 3..];
        } else if let Some(after) = tail.strip_prefix("<!") {
            let end = after
                .find('>')
                .ok_or_else(|| DecodeError::Malformed("unterminated declaration".into()))?;
            rest = &after[end + 1..];
        } else {
            let end = tail
                .find('>')
                .ok_or_else(|| DecodeError::Malformed("unterminated tag".into()))?;
            let inner = &tail[1..end];
            tokens.push(parse_tag(inner)?);
            rest = &tail[end + 1..];
        }
    }
    Ok(tokens)
}

fn parse_tag(inner: &str) -> Result<Token<'_>, DecodeError> {
    if let Some(name_part) = inner.strip_prefix('/') {
        let name = name_part.trim();
        if !valid_name(name) {
            return Err(DecodeError::Malformed(format!("invalid closing tag {name:?}")));
        }
        return Ok(Token::Close(name));
    }
    let self_closing = inner.ends_with('/');
    let inner = inner.strip_suffix('/').unwrap_or(inner);
    let name = inner
        .split_whitespace()
        .next()
        .ok_or_else(|| DecodeError::Malformed("empty tag".into()))?;
    if inner.starts_with(char::is_whitespace) || !valid_name(name) {
        return Err(DecodeError::Malformed(format!("invalid tag {name:?}")));
    }
    if self_closing {
        Ok(Token::Empty(name))
    } else {
        Ok(Token::Open(name))
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':')
}

fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// First SOAP Fault in the token stream, as its message text.
fn find_fault(tokens: &[Token]) -> Option<String> {
    for (i, tok) in tokens.iter().enumerate() {
        let name = match *tok {
            Token::Open(n) | Token::Empty(n) => n,
            _ => continue,
        };
        if !local_name(name).eq_ignore_ascii_case("fault") {
            continue;
        }
        if matches!(tok, Token::Empty(_)) {
            return Some("unspecified fault".into());
        }
        let message = decode_subtree(tokens, i)
            .ok()
            .and_then(|fields| {
                fields
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("faultstring"))
                    .map(|(_, v)| v.trim().to_owned())
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "unspecified fault".into());
        return Some(message);
    }
    None
}

fn decode_wrapper(tokens: &[Token], operation: &str) -> Result<BTreeMap<String, String>, DecodeError> {
    let wrapper = format!("{operation}Response");
    for (i, tok) in tokens.iter().enumerate() {
        match *tok {
            Token::Open(name) if local_name(name) == wrapper => {
                return decode_subtree(tokens, i);
            }
            Token::Empty(name) if local_name(name) == wrapper => {
                return Ok(BTreeMap::new());
            }
            _ => {}
        }
    }
    Err(DecodeError::MissingWrapper {
        operation: operation.to_owned(),
    })
}

/// Decode the element subtree opening at `tokens[start]` into a flat
/// leaf map. Requires balanced, name-matched tags the whole way down.
fn decode_subtree(
    tokens: &[Token<'_>],
    start: usize,
) -> Result<BTreeMap<String, String>, DecodeError> {
    let Token::Open(root) = tokens[start] else {
        return Err(DecodeError::Malformed("expected an opening tag".into()));
    };
    let mut stack: Vec<&str> = vec![root];
    let mut fields = BTreeMap::new();
    let mut text = String::new();
    let mut has_child = false;
    for tok in &tokens[start + 1..] {
        match *tok {
            Token::Open(name) => {
                stack.push(name);
                text.clear();
                has_child = false;
            }
            Token::Empty(name) => {
                fields.entry(local_name(name).to_owned()).or_default();
                has_child = true;
            }
            Token::Text(t) => {
                text.push_str(t);
            }
            Token::Close(name) => {
                let open = stack
                    .pop()
                    .ok_or_else(|| DecodeError::Malformed(format!("stray closing tag {name:?}")))?;
                if open != name {
                    return Err(DecodeError::Malformed(format!(
                        "expected </{open}>, found </{name}>"
                    )));
                }
                if stack.is_empty() {
                    return Ok(fields);
                }
                if !has_child {
                    fields
                        .entry(local_name(open).to_owned())
                        .or_insert_with(|| unescape(text.trim()));
                }
                text.clear();
                has_child = true;
            }
        }
    }
    Err(DecodeError::Malformed(format!(
        "body ends inside <{root}>"
    )))
}
