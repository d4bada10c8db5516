//! Variation choice attached to a cart line or order item.
//!
//! Persisted as JSONB; the tagged form keeps the payload explicit instead of a
//! free-form blob trusted deep into the checkout path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSelection {
    NoVariation,
    Variation {
        option_uuid: Uuid,
        name: String,
        value: String,
        /// Option-level price override captured when the line was added.
        price: Option<Decimal>,
        sku: Option<String>,
    },
}

impl ItemSelection {
    pub fn option_uuid(&self) -> Option<Uuid> {
        match self {
            Self::NoVariation => None,
            Self::Variation { option_uuid, .. } => Some(*option_uuid),
        }
    }

    pub fn price_override(&self) -> Option<Decimal> {
        match self {
            Self::NoVariation => None,
            Self::Variation { price, .. } => *price,
        }
    }

    /// Human label used in stock error messages, e.g. "Shirt - Large".
    pub fn describe(&self, product_name: &str) -> String {
        match self {
            Self::NoVariation => product_name.to_string(),
            Self::Variation { value, .. } => format!("{product_name} - {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_roundtrip() {
        let sel = ItemSelection::Variation {
            option_uuid: Uuid::new_v4(),
            name: "Size".into(),
            value: "Large".into(),
            price: Some(Decimal::new(12550, 2)),
            sku: Some("SHIRT-L".into()),
        };
        let json = serde_json::to_string(&sel).unwrap();
        assert!(json.contains("\"kind\":\"variation\""));
        let back: ItemSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn test_no_variation_has_no_override() {
        let sel = ItemSelection::NoVariation;
        assert_eq!(sel.price_override(), None);
        assert_eq!(sel.option_uuid(), None);
        assert_eq!(sel.describe("Mug"), "Mug");
    }

    #[test]
    fn test_describe_includes_option_value() {
        let sel = ItemSelection::Variation {
            option_uuid: Uuid::new_v4(),
            name: "Size".into(),
            value: "Large".into(),
            price: None,
            sku: None,
        };
        assert_eq!(sel.describe("Shirt"), "Shirt - Large");
    }
}
