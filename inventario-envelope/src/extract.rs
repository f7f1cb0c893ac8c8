//! Tolerant field extraction.
//!
//! When the strict decoder rejects a body, whether over damaged markup
//! or a fault wrapping real data, this path assumes the text still
//! holds something worth keeping and goes hunting with patterns.
//! Every step tolerates any namespace prefix and any letter case, and a
//! step that finds nothing simply widens the search instead of failing.

use crate::escape::unescape;
use inventario_types::{ExtractionResult, FieldKind, FieldSpec};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Elements the service uses as an operation-level success flag.
const SUCCESS_FLAGS: [&str; 1] = ["exitoso"];

/// Message-bearing elements, in the order a reader would trust them.
const MESSAGE_FIELDS: [&str; 2] = ["mensaje", "faultstring"];

/// Containers the service nests record data under.
const DATA_CONTAINERS: [&str; 3] = ["articulo", "respuesta", "return"];

/// Fallback message when a body yields no identifying data.
///
/// Callers that treat a recovered message as a server-side rejection
/// compare against this to tell the two apart.
pub const NO_DATA_MESSAGE: &str = "no data found in response";

/// Pattern-based recovery of known fields from a damaged body.
///
/// The service-wide patterns (success flag, message, data containers)
/// compile once at construction; per-field patterns are built from the
/// caller's [`FieldSpec`] names at extraction time. Extraction is a pure
/// function of its inputs: the same body and field list always produce
/// the same result.
pub struct Extractor {
    success_flags: Vec<Regex>,
    message_fields: Vec<Regex>,
    data_containers: Vec<Regex>,
}

impl Extractor {
    /// Compile the service-wide patterns.
    pub fn new() -> Self {
        let compile = |names: &[&str]| -> Vec<Regex> {
            names
                .iter()
                .map(|n| Regex::new(&any_prefix_pattern(n)).expect("valid regex"))
                .collect()
        };
        Self {
            success_flags: compile(&SUCCESS_FLAGS),
            message_fields: compile(&MESSAGE_FIELDS),
            data_containers: compile(&DATA_CONTAINERS),
        }
    }

    /// Recover what the body holds for `operation`, looking for the
    /// caller's expected `fields`.
    ///
    /// The strategy list, most specific first:
    ///
    /// 1. Narrow to the `<{operation}Response>` wrapper when one can be
    ///    found (any prefix, any case); otherwise search the whole body.
    /// 2. Read the success flag and message. A flag that is explicitly
    ///    false is an answer in itself: return it with the message and
    ///    skip the field hunt.
    /// 3. Narrow further to a known data container when one is present.
    /// 4. Per requested field: exact tag in the container, prefixed tag
    ///    in the container, then both again over the wider scope. First
    ///    match wins. Numeric kinds normalize unparseable text to `"0"`.
    /// 5. Success means at least one identifying field came back: a
    ///    text-kind field, or any field at all when the caller requested
    ///    no text fields.
    pub fn extract(&self, raw: &str, operation: &str, fields: &[FieldSpec]) -> ExtractionResult {
        let narrowed = self.narrow(raw, operation);

        let flag =
            first_capture(&self.success_flags, narrowed).map(|f| f.to_ascii_lowercase());
        let message = first_capture(&self.message_fields, narrowed).map(|m| unescape(&m));

        if matches!(flag.as_deref(), Some("false") | Some("0")) {
            return ExtractionResult {
                success: false,
                fields: BTreeMap::new(),
                message,
            };
        }

        let container = self
            .data_containers
            .iter()
            .find_map(|re| capture(re, narrowed))
            .unwrap_or(narrowed);

        let mut recovered = BTreeMap::new();
        for spec in fields {
            let Some(text) = find_field(&spec.name, container, narrowed) else {
                continue;
            };
            recovered.insert(
                spec.name.clone(),
                normalize(spec.kind, unescape(text.trim())),
            );
        }

        let requested_text = fields.iter().any(|f| f.kind == FieldKind::Text);
        let success = if requested_text {
            fields
                .iter()
                .filter(|f| f.kind == FieldKind::Text)
                .any(|f| recovered.contains_key(&f.name))
        } else {
            !recovered.is_empty()
        };

        if success {
            ExtractionResult {
                success: true,
                fields: recovered,
                message,
            }
        } else {
            ExtractionResult {
                success: false,
                fields: recovered,
                message: message.or_else(|| Some(NO_DATA_MESSAGE.into())),
            }
        }
    }

    /// Content of the operation's response wrapper, or the whole body
    /// when no wrapper survives.
    fn narrow<'a>(&self, raw: &'a str, operation: &str) -> &'a str {
        let wrapper = format!("{operation}Response");
        match Regex::new(&any_prefix_pattern(&wrapper)) {
            Ok(re) => capture(&re, raw).unwrap_or(raw),
            Err(_) => raw,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// `<name>…</name>` under an optional namespace prefix, case-insensitive,
/// capturing the inner text.
fn any_prefix_pattern(name: &str) -> String {
    let name = regex::escape(name);
    format!(r"(?is)<(?:[a-z0-9_.\-]+:)?{name}(?:\s[^>]*)?>(.*?)</(?:[a-z0-9_.\-]+:)?{name}\s*>")
}

/// Same element, but the tag must be bare, with no prefix.
fn exact_pattern(name: &str) -> String {
    let name = regex::escape(name);
    format!(r"(?is)<{name}(?:\s[^>]*)?>(.*?)</(?:[a-z0-9_.\-]+:)?{name}\s*>")
}

/// Same element, but the tag must carry a prefix.
fn prefixed_pattern(name: &str) -> String {
    let name = regex::escape(name);
    format!(r"(?is)<[a-z0-9_.\-]+:{name}(?:\s[^>]*)?>(.*?)</(?:[a-z0-9_.\-]+:)?{name}\s*>")
}

fn capture<'a>(re: &Regex, hay: &'a str) -> Option<&'a str> {
    re.captures(hay).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn first_capture(patterns: &[Regex], hay: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| capture(re, hay))
        .map(|m| m.trim().to_owned())
}

/// One field, by the strategy order: exact tag in the container, prefixed
/// tag in the container, then both again over the wider scope. A name
/// whose pattern will not compile is skipped, not fatal.
fn find_field<'a>(name: &str, container: &'a str, scope: &'a str) -> Option<&'a str> {
    let exact = Regex::new(&exact_pattern(name)).ok();
    let prefixed = Regex::new(&prefixed_pattern(name)).ok();
    if let Some(hit) = exact.as_ref().and_then(|re| capture(re, container)) {
        return Some(hit);
    }
    if let Some(hit) = prefixed.as_ref().and_then(|re| capture(re, container)) {
        return Some(hit);
    }
    if let Some(hit) = exact.as_ref().and_then(|re| capture(re, scope)) {
        return Some(hit);
    }
    prefixed.as_ref().and_then(|re| capture(re, scope))
}

/// Keep text verbatim; hold numeric kinds to a parseable standard, with
/// decimal commas tolerated and everything else collapsing to `"0"`.
fn normalize(kind: FieldKind, text: String) -> String {
    match kind {
        FieldKind::Text => text,
        FieldKind::Int => {
            let t = text.trim();
            if t.parse::<i64>().is_ok() {
                t.to_owned()
            } else {
                "0".into()
            }
        }
        FieldKind::Decimal => {
            let t = text.trim();
            if Decimal::from_str(t).is_ok() {
                return t.to_owned();
            }
            let with_dot = t.replace(',', ".");
            if Decimal::from_str(&with_dot).is_ok() {
                with_dot
            } else {
                "0".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("codigo"),
            FieldSpec::text("nombre"),
            FieldSpec::decimal("precioVenta"),
            FieldSpec::int("stockActual"),
        ]
    }

    #[test]
    fn recovers_fields_from_a_truncated_body() {
        // Cut off mid-element: no closing wrapper, no closing envelope.
        let raw = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                   <soap:Body><ns2:consultarArticuloResponse>\
                   <exitoso>true</exitoso><mensaje>Artículo encontrado</mensaje>\
                   <articulo><codigo>MART001</codigo><nombre>Martillo de uña</nombre>\
                   <precioVenta>25.50</precioVenta><stockActual>14";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());

        assert!(result.success);
        assert_eq!(result.fields["codigo"], "MART001");
        assert_eq!(result.fields["nombre"], "Martillo de uña");
        assert_eq!(result.fields["precioVenta"], "25.50");
        // The cut element never closed, so it is simply absent.
        assert!(!result.fields.contains_key("stockActual"));
        assert_eq!(result.message.as_deref(), Some("Artículo encontrado"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let raw = "<ns2:consultarArticuloResponse><articulo>\
                   <codigo>TORN042</codigo></articulo>";
        let extractor = Extractor::new();
        let first = extractor.extract(raw, "consultarArticulo", &article_fields());
        let second = extractor.extract(raw, "consultarArticulo", &article_fields());
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_false_flag_short_circuits() {
        let raw = "<soapenv:Envelope><soapenv:Body>\
                   <ns2:actualizarStockResponse>\
                   <exitoso>false</exitoso>\
                   <mensaje>Stock insuficiente</mensaje>\
                   <articulo><codigo>TORN042</codigo></articulo>\
                   </ns2:actualizarStockResponse>\
                   </soapenv:Body></soapenv:Envelope>";
        let result = Extractor::new().extract(raw, "actualizarStock", &article_fields());

        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Stock insuficiente"));
        // Data fields are not hunted once the server said no.
        assert!(result.fields.is_empty());
    }

    #[test]
    fn uppercase_false_counts_as_explicit_false() {
        let raw = "<ns2:actualizarStockResponse><EXITOSO>FALSE</EXITOSO>\
                   </ns2:actualizarStockResponse>";
        let result = Extractor::new().extract(raw, "actualizarStock", &[]);
        assert!(!result.success);
    }

    #[test]
    fn recovers_across_namespace_prefixes() {
        let raw = "<inv:consultarArticuloResponse>\
                   <inv:articulo><inv:codigo>CLAV100</inv:codigo>\
                   <inv:nombre>Clavos 100mm</inv:nombre></inv:articulo>\
                   </inv:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert!(result.success);
        assert_eq!(result.fields["codigo"], "CLAV100");
        assert_eq!(result.fields["nombre"], "Clavos 100mm");
    }

    #[test]
    fn narrows_to_the_requested_wrapper() {
        // Two wrappers in one body; only the requested one is searched.
        let raw = "<ns2:otraCosaResponse><codigo>NO</codigo></ns2:otraCosaResponse>\
                   <ns2:consultarArticuloResponse><articulo>\
                   <codigo>SI001</codigo></articulo></ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert_eq!(result.fields["codigo"], "SI001");
    }

    #[test]
    fn container_match_beats_stray_siblings() {
        let raw = "<ns2:consultarArticuloResponse>\
                   <referencia><codigo>REF999</codigo></referencia>\
                   <articulo><codigo>ART001</codigo></articulo>\
                   </ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        // "referencia" is not a known container; "articulo" is.
        assert_eq!(result.fields["codigo"], "ART001");
    }

    #[test]
    fn lenient_numerics_default_to_zero() {
        let raw = "<ns2:consultarArticuloResponse><articulo>\
                   <codigo>BROC055</codigo>\
                   <precioVenta>sin precio</precioVenta>\
                   <stockActual>N/A</stockActual>\
                   </articulo></ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert!(result.success);
        assert_eq!(result.fields["precioVenta"], "0");
        assert_eq!(result.fields["stockActual"], "0");
    }

    #[test]
    fn decimal_commas_are_tolerated() {
        let raw = "<ns2:consultarArticuloResponse><articulo>\
                   <codigo>PINT020</codigo><precioVenta>189,90</precioVenta>\
                   </articulo></ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert_eq!(result.fields["precioVenta"], "189.90");
    }

    #[test]
    fn faultstring_becomes_the_message() {
        let raw = "<soap:Envelope><soap:Body><soap:Fault>\
                   <faultcode>soap:Server</faultcode>\
                   <faultstring>Error interno del servidor</faultstring>\
                   </soap:Fault></soap:Body></soap:Envelope>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("Error interno del servidor")
        );
    }

    #[test]
    fn no_identifying_field_yields_generic_message() {
        let raw = "<ns2:consultarArticuloResponse><exitoso>true</exitoso>\
                   </ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("no data found in response"));
    }

    #[test]
    fn numeric_only_requests_count_any_recovery_as_identifying() {
        let raw = "<ns2:actualizarStockResponse>\
                   <stockAnterior>10</stockAnterior><stockNuevo>75</stockNuevo>\
                   </ns2:actualizarStockResponse>";
        let fields = vec![FieldSpec::int("stockAnterior"), FieldSpec::int("stockNuevo")];
        let result = Extractor::new().extract(raw, "actualizarStock", &fields);
        assert!(result.success);
        assert_eq!(result.fields["stockNuevo"], "75");
    }

    #[test]
    fn entities_are_unescaped_in_recovered_text() {
        let raw = "<ns2:consultarArticuloResponse><articulo>\
                   <codigo>SIER010</codigo>\
                   <nombre>Sierra &quot;carpintero&quot; &amp; repuestos</nombre>\
                   </articulo></ns2:consultarArticuloResponse>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert_eq!(
            result.fields["nombre"],
            "Sierra \"carpintero\" & repuestos"
        );
    }

    #[test]
    fn whole_body_is_searched_when_no_wrapper_survives() {
        let raw = "<articulo><codigo>SOLO001</codigo><nombre>Taladro</nombre></articulo>";
        let result = Extractor::new().extract(raw, "consultarArticulo", &article_fields());
        assert!(result.success);
        assert_eq!(result.fields["codigo"], "SOLO001");
    }
}
