//! Envelope completeness detection.
//!
//! HTTP middleboxes and flaky connections hand this client bodies that
//! were cut off mid-flight. Before any decoding, each body gets a verdict:
//! does it even claim to be a SOAP envelope, and if so, did it arrive
//! whole? The verdict drives the retry decision upstream.

use inventario_types::Completeness;

/// Namespace prefixes conventional SOAP 1.1 stacks put on the envelope.
const ENVELOPE_PREFIXES: [&str; 4] = ["soap", "soapenv", "s", "env"];

/// Classify one raw response body. Pure; computed fresh per attempt.
///
/// - A closed envelope (`</p:Envelope>`) or closed body (`</p:Body>`)
///   under any conventional prefix, compared case-insensitively, means
///   [`Completeness::Complete`], even for bodies far smaller than any
///   plausible response, since closure is positive evidence.
/// - A body with no envelope opening marker at all is
///   [`Completeness::NotApplicable`], whatever its length: proxy error
///   pages and JSON gateway responses are not damaged envelopes.
/// - Everything else is [`Completeness::Truncated`]. An envelope that
///   opens and never closes cannot be complete; this subsumes the empty
///   body, the sub-200-byte fragment, the body cut inside a tag, and the
///   body cut right after `<p:Body>` opens.
///
/// # Examples
///
/// ```
/// use inventario_envelope::classify;
/// use inventario_types::Completeness;
///
/// let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
///   <soap:Body><ns2:verificarEstadoResponse/></soap:Body>
/// </soap:Envelope>"#;
/// assert_eq!(classify(body), Completeness::Complete);
///
/// assert_eq!(classify("<soap:Envelope><soap:Body><ns2:con"), Completeness::Truncated);
/// assert_eq!(classify("502 Bad Gateway"), Completeness::NotApplicable);
/// ```
pub fn classify(raw: &str) -> Completeness {
    let body = raw.trim();
    if body.is_empty() {
        return Completeness::Truncated;
    }
    let lower = body.to_ascii_lowercase();
    if !envelope_opened(&lower) {
        return Completeness::NotApplicable;
    }
    if envelope_closed(&lower) {
        Completeness::Complete
    } else {
        Completeness::Truncated
    }
}

/// Whether a lowercased body carries an envelope opening marker.
pub(crate) fn envelope_opened(lower: &str) -> bool {
    if open_marker(lower, "<envelope") {
        return true;
    }
    ENVELOPE_PREFIXES
        .iter()
        .any(|p| open_marker(lower, &format!("<{p}:envelope")))
}

fn envelope_closed(lower: &str) -> bool {
    if lower.contains("</envelope>") || lower.contains("</body>") {
        return true;
    }
    ENVELOPE_PREFIXES.iter().any(|p| {
        lower.contains(&format!("</{p}:envelope>")) || lower.contains(&format!("</{p}:body>"))
    })
}

/// Find `needle` followed by a tag-name boundary: whitespace, `>`, `/`,
/// or end of input (the marker itself may be where the cut happened).
fn open_marker(lower: &str, needle: &str) -> bool {
    let mut from = 0;
    while let Some(pos) = lower[from..].find(needle) {
        let end = from + pos + needle.len();
        match lower.as_bytes().get(end) {
            None => return true,
            Some(&b) if b == b'>' || b == b'/' || b.is_ascii_whitespace() => return true,
            _ => from = from + pos + 1,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(prefix: &str, body: &str) -> String {
        format!(
            "<{prefix}:Envelope xmlns:{prefix}=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <{prefix}:Body>{body}</{prefix}:Body></{prefix}:Envelope>"
        )
    }

    #[test]
    fn complete_under_every_conventional_prefix() {
        for prefix in ["soap", "soapenv", "S", "env"] {
            let body = envelope(prefix, "<ns2:verificarEstadoResponse/>");
            assert_eq!(classify(&body), Completeness::Complete, "{prefix}");
        }
    }

    #[test]
    fn closed_body_without_closed_envelope_counts_as_complete() {
        let body = "<soapenv:Envelope><soapenv:Body>\
                    <ns2:respuesta>ok</ns2:respuesta></soapenv:Body>";
        assert_eq!(classify(body), Completeness::Complete);
    }

    #[test]
    fn closure_beats_short_length() {
        // Well under 200 bytes, but positively closed.
        let body = "<soap:Envelope><soap:Body/></soap:Envelope>";
        assert!(body.len() < 200);
        assert_eq!(classify(body), Completeness::Complete);
    }

    #[test]
    fn empty_and_whitespace_bodies_are_truncated() {
        assert_eq!(classify(""), Completeness::Truncated);
        assert_eq!(classify("   \n\t  "), Completeness::Truncated);
    }

    #[test]
    fn short_unclosed_fragment_is_truncated() {
        assert_eq!(
            classify("<soap:Envelope><soap:Body>"),
            Completeness::Truncated
        );
    }

    #[test]
    fn body_cut_inside_a_tag_is_truncated() {
        let body = "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                    <soapenv:Body><ns2:consultarArticuloRes";
        assert_eq!(classify(body), Completeness::Truncated);
    }

    #[test]
    fn body_cut_right_after_body_opens_is_truncated() {
        let body = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                    <soap:Body>\n  ";
        assert_eq!(classify(body), Completeness::Truncated);
    }

    #[test]
    fn long_envelope_that_never_closes_is_truncated() {
        let mut body = String::from("<soap:Envelope><soap:Body><ns2:consultarArticuloResponse>");
        body.push_str(&"<fila>relleno de datos</fila>".repeat(20));
        assert!(body.len() > 200);
        assert_eq!(classify(&body), Completeness::Truncated);
    }

    #[test]
    fn non_envelope_payloads_are_not_applicable_at_any_length() {
        assert_eq!(classify("404 page not found"), Completeness::NotApplicable);
        assert_eq!(
            classify("{\"error\": \"gateway timeout\"}"),
            Completeness::NotApplicable
        );
        let long_html = format!("<html><body>{}</body></html>", "x".repeat(500));
        assert_eq!(classify(&long_html), Completeness::NotApplicable);
    }

    #[test]
    fn envelope_needs_a_clean_name_boundary() {
        // "envelopes" is not an envelope marker.
        assert_eq!(
            classify("<envelopes><body>mail</body></envelopes>"),
            Completeness::NotApplicable
        );
    }

    #[test]
    fn unprefixed_envelope_is_recognized() {
        let body = "<Envelope xmlns=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                    <Body><r/></Body></Envelope>";
        assert_eq!(classify(body), Completeness::Complete);
    }

    #[test]
    fn marker_at_end_of_cut_body_still_counts_as_opened() {
        assert_eq!(classify("<soap:envelope"), Completeness::Truncated);
    }
}
