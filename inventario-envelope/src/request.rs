//! Rendering one request envelope.
//!
//! The service publishes document/literal wrapped operations: one body
//! element named after the operation, qualified with the service's target
//! namespace, whose unqualified children are the arguments in schema
//! order.

use crate::escape::escape;
use inventario_types::{ArgValue, OperationCall};

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Render the full request envelope for one call.
///
/// Element names come straight from the call; run
/// [`OperationCall::validate`] first (the engine does) so markup cannot
/// ride in through a name. Text values are escaped here.
///
/// # Examples
///
/// ```
/// use inventario_envelope::render_request;
/// use inventario_types::OperationCall;
///
/// let call = OperationCall::new("consultarArticulo").arg("codigo", "MART001");
/// let envelope = render_request(&call, "http://ws.inventario.ferreteria.com/");
/// assert!(envelope.contains("<inv:consultarArticulo>"));
/// assert!(envelope.contains("<codigo>MART001</codigo>"));
/// ```
pub fn render_request(call: &OperationCall, target_namespace: &str) -> String {
    let mut args = String::new();
    for (name, value) in &call.args {
        render_arg(&mut args, name, value);
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soap:Envelope xmlns:soap=\"{SOAP_ENVELOPE_NS}\" xmlns:inv=\"{ns}\">\
         <soap:Header/>\
         <soap:Body>\
         <inv:{op}>{args}</inv:{op}>\
         </soap:Body>\
         </soap:Envelope>",
        ns = escape(target_namespace),
        op = call.operation,
    )
}

fn render_arg(out: &mut String, name: &str, value: &ArgValue) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        ArgValue::Text(s) => out.push_str(&escape(s)),
        ArgValue::Int(n) => out.push_str(&n.to_string()),
        ArgValue::Decimal(d) => out.push_str(&d.to_string()),
        ArgValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ArgValue::Nested(children) => {
            for (child_name, child) in children {
                render_arg(out, child_name, child);
            }
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const NS: &str = "http://ws.inventario.ferreteria.com/";

    #[test]
    fn renders_wrapped_operation_with_ordered_args() {
        let call = OperationCall::new("actualizarStock")
            .arg("codigo", "TORN042")
            .arg("nuevoStock", 75);
        let envelope = render_request(&call, NS);

        assert!(envelope.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(envelope.contains(&format!("xmlns:inv=\"{NS}\"")));
        assert!(envelope.contains(
            "<inv:actualizarStock><codigo>TORN042</codigo>\
             <nuevoStock>75</nuevoStock></inv:actualizarStock>"
        ));
        assert!(envelope.ends_with("</soap:Body></soap:Envelope>"));
    }

    #[test]
    fn renders_empty_wrapper_for_no_args() {
        let call = OperationCall::new("verificarEstado");
        let envelope = render_request(&call, NS);
        assert!(envelope.contains("<inv:verificarEstado></inv:verificarEstado>"));
    }

    #[test]
    fn escapes_text_argument_values() {
        let call = OperationCall::new("insertarArticulo").arg("nombre", "Clavos 2\" <acero>");
        let envelope = render_request(&call, NS);
        assert!(envelope.contains("<nombre>Clavos 2&quot; &lt;acero&gt;</nombre>"));
        assert!(!envelope.contains("<acero>"));
    }

    #[test]
    fn renders_nested_record_arguments() {
        let call = OperationCall::new("insertarArticulo").arg(
            "articulo",
            ArgValue::Nested(vec![
                ("codigo".into(), "MART001".into()),
                ("precioVenta".into(), ArgValue::Decimal(Decimal::new(2550, 2))),
                ("activo".into(), ArgValue::Bool(true)),
            ]),
        );
        let envelope = render_request(&call, NS);
        assert!(envelope.contains(
            "<articulo><codigo>MART001</codigo>\
             <precioVenta>25.50</precioVenta>\
             <activo>true</activo></articulo>"
        ));
    }
}
