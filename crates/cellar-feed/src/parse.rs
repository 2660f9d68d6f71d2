//! Validation of individual feed entries into [`RawOffer`]s.
//!
//! Suppliers are loose about types: UPCs arrive as strings or bare integers,
//! prices as JSON numbers or numeric strings. Anything else in the entry is
//! passed through untouched as catalog attributes.

use std::str::FromStr;

use cellar_core::RawOffer;
use rust_decimal::Decimal;
use serde_json::Value;

/// Keys consumed by the offer itself; never copied into `attributes`.
const RESERVED_KEYS: [&str; 5] = ["upc", "price", "image", "supplier", "supplier_id"];

/// Parses one `data.wines` entry into a [`RawOffer`] tagged with `supplier_id`.
///
/// # Errors
///
/// Returns a human-readable reason when the entry is not an object, has no
/// usable `upc`, has a missing or negative `price`, or carries an `image`
/// that is not a string.
pub fn parse_offer(entry: Value, supplier_id: i64) -> Result<RawOffer, String> {
    let mut object = match entry {
        Value::Object(object) => object,
        other => return Err(format!("entry is not a JSON object (got {})", kind(&other))),
    };

    let upc = parse_upc(object.get("upc"))?;
    let price = parse_price(object.get("price"))?;
    let image = parse_image(object.get("image"))?;

    for key in RESERVED_KEYS {
        object.remove(key);
    }

    Ok(RawOffer {
        upc,
        price,
        image,
        supplier_id,
        attributes: object,
    })
}

fn parse_upc(value: Option<&Value>) -> Result<String, String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err("upc is empty".to_string()),
        Some(Value::Number(n)) if n.is_u64() => Ok(n.to_string()),
        Some(Value::Null) | None => Err("missing upc".to_string()),
        Some(other) => Err(format!("upc must be a string (got {})", kind(other))),
    }
}

fn parse_price(value: Option<&Value>) -> Result<Decimal, String> {
    let price = match value {
        Some(Value::Number(n)) => decimal_from_str(&n.to_string()),
        Some(Value::String(s)) => decimal_from_str(s.trim()),
        Some(Value::Null) | None => return Err("missing price".to_string()),
        Some(other) => return Err(format!("price must be a number (got {})", kind(other))),
    }?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(format!("price must not be negative (got {price})"));
    }
    Ok(price)
}

fn decimal_from_str(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| format!("price \"{raw}\" is not a decimal: {e}"))
}

fn parse_image(value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(format!("image must be a string (got {})", kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
