//! Offer and catalog types shared by the feed, sync, and db crates.
//!
//! A [`RawOffer`] is one supplier's advertised price for one product as it
//! came off the wire. Stripping its inline image yields [`CatalogFields`],
//! which is exactly what gets written to the catalog. The image itself never
//! reaches the catalog; it is stored out-of-band under a path derived from
//! the UPC.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A supplier whose inventory feed is polled on every sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    /// Feed root, e.g. `"https://supplier.example/api/"`. The inventory
    /// resource is `wines` relative to this URL.
    pub base_url: String,
}

/// One supplier's offer for a product, parsed from the feed.
#[derive(Clone, PartialEq)]
pub struct RawOffer {
    /// Natural product key shared across suppliers.
    pub upc: String,
    pub price: Decimal,
    /// Inline image as a data URI, when the supplier sent one.
    pub image: Option<String>,
    pub supplier_id: i64,
    /// Every other field from the feed entry, passed through verbatim.
    pub attributes: Map<String, Value>,
}

impl RawOffer {
    /// Splits the offer into the fields written to the catalog and the
    /// inline image payload, if any.
    #[must_use]
    pub fn into_parts(self) -> (CatalogFields, Option<String>) {
        let fields = CatalogFields {
            upc: self.upc,
            price: self.price,
            supplier_id: self.supplier_id,
            attributes: self.attributes,
        };
        (fields, self.image)
    }
}

// Image payloads are routinely hundreds of kilobytes of base64; keep them out
// of log lines.
impl std::fmt::Debug for RawOffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawOffer")
            .field("upc", &self.upc)
            .field("price", &self.price)
            .field(
                "image",
                &self.image.as_ref().map(|i| format!("<{} bytes>", i.len())),
            )
            .field("supplier_id", &self.supplier_id)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// The persisted attributes of a catalog record: a [`RawOffer`] minus its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFields {
    pub upc: String,
    pub price: Decimal,
    pub supplier_id: i64,
    pub attributes: Map<String, Value>,
}

/// A catalog entry keyed uniquely by UPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub fields: CatalogFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offer_with_image() -> RawOffer {
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), json!("Cabernet Sauvignon"));
        RawOffer {
            upc: "111".to_string(),
            price: Decimal::new(999, 2),
            image: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            supplier_id: 3,
            attributes,
        }
    }

    #[test]
    fn into_parts_strips_image() {
        let (fields, image) = offer_with_image().into_parts();
        assert_eq!(fields.upc, "111");
        assert_eq!(fields.price, Decimal::new(999, 2));
        assert_eq!(fields.supplier_id, 3);
        assert_eq!(fields.attributes["name"], json!("Cabernet Sauvignon"));
        assert_eq!(image.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    }

    #[test]
    fn debug_hides_image_payload() {
        let rendered = format!("{:?}", offer_with_image());
        assert!(!rendered.contains("iVBORw0KGgo"));
        assert!(rendered.contains("<34 bytes>"));
    }
}
