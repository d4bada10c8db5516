//! Checkout validation and pricing.
//!
//! The route handler resolves cart lines and catalog rows, then hands the
//! snapshots to [`price_cart`]. Everything here is pure so the invariants
//! (stock validation order, price capture, subtotal/total arithmetic) can be
//! tested directly.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::selection::ItemSelection;

#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Invalid payment method")]
    InvalidPaymentMethod,
    #[error("No items found in cart")]
    EmptyCart,
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("Product variation not found: {0}")]
    VariationNotFound(Uuid),
    #[error("Product variation option not found")]
    OptionNotFound,
    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),
}

#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub product_uuid: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct VariationSnapshot {
    pub variation_uuid: Uuid,
    pub product_uuid: Uuid,
}

#[derive(Debug, Clone)]
pub struct OptionSnapshot {
    pub option_uuid: Uuid,
    pub variation_uuid: Uuid,
    pub value: String,
    pub price: Option<Decimal>,
    pub stock: i32,
}

/// One cart line with every row the handler could resolve for it. `None`
/// means the reference did not resolve and is reported as the matching error.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub cart_item_uuid: Uuid,
    pub product_uuid: Uuid,
    pub variation_ref: Option<Uuid>,
    pub selection: ItemSelection,
    pub quantity: i32,
    pub product: Option<ProductSnapshot>,
    pub variation: Option<VariationSnapshot>,
    pub option: Option<OptionSnapshot>,
}

/// Granularity at which stock was validated, and therefore must be
/// decremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockRef {
    Product { product_uuid: Uuid },
    VariationOption { option_uuid: Uuid, variation_uuid: Uuid, product_uuid: Uuid },
}

#[derive(Debug, Clone)]
pub struct PricedLine {
    pub cart_item_uuid: Uuid,
    pub product_uuid: Uuid,
    pub product_name: String,
    pub variation_uuid: Option<Uuid>,
    pub selection: ItemSelection,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub stock: StockRef,
}

#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

/// Validates every line in cart order, then prices the draft.
///
/// Unit price is the selection's captured option price when present, else the
/// product price. Stock is checked at option granularity when an option was
/// selected, else against the product quantity.
pub fn price_cart(lines: Vec<LineInput>, shipping_fee: Decimal) -> Result<OrderDraft, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        priced.push(price_line(line)?);
    }

    let subtotal: Decimal = priced.iter().map(|l| l.subtotal).sum();
    let total = subtotal + shipping_fee;
    Ok(OrderDraft { lines: priced, subtotal, shipping_fee, total })
}

fn price_line(line: LineInput) -> Result<PricedLine, CheckoutError> {
    let product = line
        .product
        .ok_or(CheckoutError::ProductNotFound(line.product_uuid))?;

    let option = match line.variation_ref {
        Some(variation_uuid) => {
            let variation = line
                .variation
                .filter(|v| v.product_uuid == product.product_uuid)
                .ok_or(CheckoutError::VariationNotFound(variation_uuid))?;
            match &line.selection {
                ItemSelection::NoVariation => None,
                ItemSelection::Variation { .. } => {
                    let option = line
                        .option
                        .filter(|o| o.variation_uuid == variation.variation_uuid)
                        .ok_or(CheckoutError::OptionNotFound)?;
                    Some(option)
                }
            }
        }
        None => None,
    };

    let available = option.as_ref().map_or(product.quantity, |o| o.stock);
    if available < line.quantity {
        return Err(CheckoutError::InsufficientStock(
            line.selection.describe(&product.name),
        ));
    }

    let unit_price = line.selection.price_override().unwrap_or(product.price);
    let subtotal = unit_price * Decimal::from(line.quantity);
    let stock = match &option {
        Some(o) => StockRef::VariationOption {
            option_uuid: o.option_uuid,
            variation_uuid: o.variation_uuid,
            product_uuid: product.product_uuid,
        },
        None => StockRef::Product { product_uuid: product.product_uuid },
    };

    Ok(PricedLine {
        cart_item_uuid: line.cart_item_uuid,
        product_uuid: product.product_uuid,
        product_name: product.name,
        variation_uuid: line.variation_ref,
        selection: line.selection,
        quantity: line.quantity,
        unit_price,
        subtotal,
        stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_line(quantity: i32, price: Decimal, stock: i32) -> LineInput {
        let product_uuid = Uuid::new_v4();
        LineInput {
            cart_item_uuid: Uuid::new_v4(),
            product_uuid,
            variation_ref: None,
            selection: ItemSelection::NoVariation,
            quantity,
            product: Some(ProductSnapshot {
                product_uuid,
                name: "Canvas Tote".into(),
                price,
                quantity: stock,
            }),
            variation: None,
            option: None,
        }
    }

    fn option_line(quantity: i32, override_price: Decimal, stock: i32) -> LineInput {
        let product_uuid = Uuid::new_v4();
        let variation_uuid = Uuid::new_v4();
        let option_uuid = Uuid::new_v4();
        LineInput {
            cart_item_uuid: Uuid::new_v4(),
            product_uuid,
            variation_ref: Some(variation_uuid),
            selection: ItemSelection::Variation {
                option_uuid,
                name: "Size".into(),
                value: "Large".into(),
                price: Some(override_price),
                sku: None,
            },
            quantity,
            product: Some(ProductSnapshot {
                product_uuid,
                name: "Shirt".into(),
                price: Decimal::new(9900, 2),
                quantity: 0,
            }),
            variation: Some(VariationSnapshot { variation_uuid, product_uuid }),
            option: Some(OptionSnapshot {
                option_uuid,
                variation_uuid,
                value: "Large".into(),
                price: Some(override_price),
                stock,
            }),
        }
    }

    #[test]
    fn test_totals_add_up() {
        // quantity 3 at 100.00 plus 20.00 shipping -> 300.00 / 320.00
        let draft = price_cart(
            vec![plain_line(3, Decimal::new(10000, 2), 5)],
            Decimal::new(2000, 2),
        )
        .unwrap();
        assert_eq!(draft.subtotal, Decimal::new(30000, 2));
        assert_eq!(draft.total, Decimal::new(32000, 2));
        let line_sum: Decimal = draft.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(line_sum, draft.subtotal);
    }

    #[test]
    fn test_insufficient_stock_rejected() {
        // stock 5, requesting 6
        let err = price_cart(vec![plain_line(6, Decimal::new(10000, 2), 5)], Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err, CheckoutError::InsufficientStock("Canvas Tote".into()));
    }

    #[test]
    fn test_option_stock_and_price_override() {
        let draft = price_cart(
            vec![option_line(2, Decimal::new(12500, 2), 4)],
            Decimal::ZERO,
        )
        .unwrap();
        let line = &draft.lines[0];
        assert_eq!(line.unit_price, Decimal::new(12500, 2));
        assert_eq!(line.subtotal, Decimal::new(25000, 2));
        assert!(matches!(line.stock, StockRef::VariationOption { .. }));
    }

    #[test]
    fn test_option_stock_exhausted_names_the_option() {
        let err = price_cart(vec![option_line(5, Decimal::new(12500, 2), 4)], Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err, CheckoutError::InsufficientStock("Shirt - Large".into()));
    }

    #[test]
    fn test_variation_must_belong_to_product() {
        let mut line = option_line(1, Decimal::new(12500, 2), 4);
        // point the resolved variation at a different product
        if let Some(v) = line.variation.as_mut() {
            v.product_uuid = Uuid::new_v4();
        }
        let err = price_cart(vec![line], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, CheckoutError::VariationNotFound(_)));
    }

    #[test]
    fn test_missing_option_rejected() {
        let mut line = option_line(1, Decimal::new(12500, 2), 4);
        line.option = None;
        let err = price_cart(vec![line], Decimal::ZERO).unwrap_err();
        assert_eq!(err, CheckoutError::OptionNotFound);
    }

    #[test]
    fn test_missing_product_rejected() {
        let mut line = plain_line(1, Decimal::ONE, 1);
        line.product = None;
        let err = price_cart(vec![line], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(_)));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(price_cart(vec![], Decimal::ZERO).unwrap_err(), CheckoutError::EmptyCart);
    }
}
