//! Typed builders and views for the service's published operations.
//!
//! Builders validate the service's rules client-side, so a call that
//! would be rejected anyway never spends attempts on the wire, and they
//! pre-populate the recovery fields the extractor hunts for when a body
//! comes back damaged. The engine stays generic: any operation can still
//! be invoked by name through a hand-built
//! [`OperationCall`](inventario_types::OperationCall).

use std::collections::BTreeMap;

use inventario_types::{ArgValue, CallSuccess, FieldSpec, InvokeError, OperationCall};
use rust_decimal::Decimal;

/// The operations this catalog covers.
pub const SUPPORTED: [&str; 4] = [
    "verificarEstado",
    "consultarArticulo",
    "actualizarStock",
    "insertarArticulo",
];

/// The fields that identify an article when recovering from a damaged
/// body: code, name, sale price, current stock.
fn identifying_set() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("codigo"),
        FieldSpec::text("nombre"),
        FieldSpec::decimal("precioVenta"),
        FieldSpec::int("stockActual"),
    ]
}

/// Health check. No arguments; only the status message is recoverable.
#[must_use]
pub fn verificar_estado() -> OperationCall {
    OperationCall::new("verificarEstado").recover(FieldSpec::text("mensaje"))
}

/// Look up one article by code.
///
/// The code is trimmed; fewer than 2 remaining characters is rejected
/// before dispatch.
pub fn consultar_articulo(codigo: &str) -> Result<OperationCall, InvokeError> {
    let codigo = codigo.trim();
    if codigo.chars().count() < 2 {
        return Err(InvokeError::InvalidCall(
            "article code must be at least 2 characters".into(),
        ));
    }
    Ok(OperationCall::new("consultarArticulo")
        .arg("codigo", codigo)
        .recover_all(identifying_set()))
}

/// Set an article's stock to an absolute value.
///
/// Rejected before dispatch when the trimmed code is empty or the new
/// stock is negative. The recovery set adds the before/after stock
/// levels the service echoes back.
pub fn actualizar_stock(codigo: &str, nuevo_stock: i64) -> Result<OperationCall, InvokeError> {
    let codigo = codigo.trim();
    if codigo.is_empty() {
        return Err(InvokeError::InvalidCall("article code is required".into()));
    }
    if nuevo_stock < 0 {
        return Err(InvokeError::InvalidCall(
            "stock must not be negative".into(),
        ));
    }
    Ok(OperationCall::new("actualizarStock")
        .arg("codigo", codigo)
        .arg("nuevoStock", nuevo_stock)
        .recover_all(identifying_set())
        .recover(FieldSpec::int("stockAnterior"))
        .recover(FieldSpec::int("stockNuevo")))
}

/// A new article, validated against the service's catalog rules by
/// [`insertar_articulo`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    /// Catalog code. Normalized to uppercase; 4 to 20 letters or digits.
    pub code: String,
    /// Display name, 3 to 200 characters.
    pub name: String,
    /// Free-text description, up to 1000 characters.
    pub description: String,
    /// Purchase price, 0.01 to 999999.99.
    pub purchase_price: Decimal,
    /// Sale price, same range, strictly above the purchase price.
    pub sale_price: Decimal,
    /// Opening stock level.
    pub stock: i64,
    /// Reorder threshold, at most 10000.
    pub min_stock: i64,
}

/// Register a new article in the catalog.
///
/// The service publishes its validation rules, and this builder applies
/// them client-side so a doomed call never goes on the wire. The code is
/// trimmed and uppercased before the pattern check.
///
/// # Example
///
/// ```
/// use inventario_client::ops::{insertar_articulo, NewArticle};
/// use rust_decimal::Decimal;
///
/// let call = insertar_articulo(&NewArticle {
///     code: "mart001".into(),
///     name: "Martillo de uña".into(),
///     description: "Mango de fibra de vidrio".into(),
///     purchase_price: Decimal::new(1510, 2),
///     sale_price: Decimal::new(2550, 2),
///     stock: 25,
///     min_stock: 5,
/// })
/// .unwrap();
/// assert_eq!(call.operation, "insertarArticulo");
/// ```
pub fn insertar_articulo(article: &NewArticle) -> Result<OperationCall, InvokeError> {
    let code = article.code.trim().to_uppercase();
    let code_ok = (4..=20).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !code_ok {
        return Err(InvokeError::InvalidCall(
            "article code must be 4 to 20 uppercase letters or digits".into(),
        ));
    }

    let name = article.name.trim();
    if !(3..=200).contains(&name.chars().count()) {
        return Err(InvokeError::InvalidCall(
            "article name must be 3 to 200 characters".into(),
        ));
    }

    let description = article.description.trim();
    if description.chars().count() > 1000 {
        return Err(InvokeError::InvalidCall(
            "description must be at most 1000 characters".into(),
        ));
    }

    let min_price = Decimal::new(1, 2);
    let max_price = Decimal::new(99_999_999, 2);
    for price in [article.purchase_price, article.sale_price] {
        if price < min_price || price > max_price {
            return Err(InvokeError::InvalidCall(
                "prices must be between 0.01 and 999999.99".into(),
            ));
        }
    }
    if article.sale_price <= article.purchase_price {
        return Err(InvokeError::InvalidCall(
            "sale price must be above the purchase price".into(),
        ));
    }

    if article.stock < 0 || article.min_stock < 0 {
        return Err(InvokeError::InvalidCall(
            "stock levels must not be negative".into(),
        ));
    }
    if article.min_stock > 10_000 {
        return Err(InvokeError::InvalidCall(
            "minimum stock must be at most 10000".into(),
        ));
    }

    Ok(OperationCall::new("insertarArticulo")
        .arg(
            "articulo",
            ArgValue::Nested(vec![
                ("codigo".into(), code.into()),
                ("nombre".into(), name.into()),
                ("descripcion".into(), description.into()),
                ("precioCompra".into(), article.purchase_price.into()),
                ("precioVenta".into(), article.sale_price.into()),
                ("stockActual".into(), ArgValue::Int(article.stock)),
                ("stockMinimo".into(), ArgValue::Int(article.min_stock)),
            ]),
        )
        .recover_all(identifying_set()))
}

/// An article as the service reports it. Every field is optional: a
/// recovered response may carry only the identifying subset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Article {
    /// Catalog code (`codigo`).
    pub code: Option<String>,
    /// Display name (`nombre`).
    pub name: Option<String>,
    /// Description (`descripcion`).
    pub description: Option<String>,
    /// Purchase price (`precioCompra`).
    pub purchase_price: Option<Decimal>,
    /// Sale price (`precioVenta`).
    pub sale_price: Option<Decimal>,
    /// Current stock (`stockActual`).
    pub stock: Option<i64>,
    /// Reorder threshold (`stockMinimo`).
    pub min_stock: Option<i64>,
}

impl Article {
    /// Read whatever article fields a response carried. Unparseable
    /// numerics read as absent, never as an error.
    #[must_use]
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        Self {
            code: fields.get("codigo").cloned(),
            name: fields.get("nombre").cloned(),
            description: fields.get("descripcion").cloned(),
            purchase_price: parse_decimal(fields.get("precioCompra")),
            sale_price: parse_decimal(fields.get("precioVenta")),
            stock: parse_int(fields.get("stockActual")),
            min_stock: parse_int(fields.get("stockMinimo")),
        }
    }
}

/// The service's generic reply shape: a flag, a message, and possibly
/// an article record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationReply {
    /// The `exitoso` flag, when the response carried one.
    pub accepted: Option<bool>,
    /// The `mensaje` text (or a fault message on the recovered path).
    pub message: Option<String>,
    /// Article fields, when any were present.
    pub article: Article,
}

impl OperationReply {
    /// View a successful call as the service's reply shape.
    #[must_use]
    pub fn from_success(success: &CallSuccess) -> Self {
        Self {
            accepted: success.fields.get("exitoso").and_then(|f| parse_flag(f)),
            message: success.message.clone(),
            article: Article::from_fields(&success.fields),
        }
    }
}

/// Reply to `actualizarStock`: the generic shape plus the stock levels
/// before and after.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StockUpdate {
    /// The `exitoso` flag, when the response carried one.
    pub accepted: Option<bool>,
    /// The `mensaje` text.
    pub message: Option<String>,
    /// Stock before the update (`stockAnterior`).
    pub previous_stock: Option<i64>,
    /// Stock after the update (`stockNuevo`).
    pub new_stock: Option<i64>,
    /// Article fields, when any were present.
    pub article: Article,
}

impl StockUpdate {
    /// View a successful call as a stock update reply.
    #[must_use]
    pub fn from_success(success: &CallSuccess) -> Self {
        Self {
            accepted: success.fields.get("exitoso").and_then(|f| parse_flag(f)),
            message: success.message.clone(),
            previous_stock: parse_int(success.fields.get("stockAnterior")),
            new_stock: parse_int(success.fields.get("stockNuevo")),
            article: Article::from_fields(&success.fields),
        }
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_int(text: Option<&String>) -> Option<i64> {
    text.and_then(|t| t.trim().parse().ok())
}

fn parse_decimal(text: Option<&String>) -> Option<Decimal> {
    text.and_then(|t| t.trim().parse().ok())
}
