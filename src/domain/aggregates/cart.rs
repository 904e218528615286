//! Cart Aggregate and checkout pricing
//!
//! The cart lives on the buyer's device. Pricing here is shared with the
//! order service so the server recomputes exactly what the buyer was shown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{HairLength, Money};

/// Lengths up to this many inches are included in the base price.
pub const BASE_LENGTH_INCHES: u32 = 20;
/// Surcharge per inch above [`BASE_LENGTH_INCHES`], per unit.
pub const LENGTH_SURCHARGE_PER_INCH: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
/// Flat shipping fee, charged once per order.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
/// Platform service fee rate (5%).
pub const SERVICE_FEE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// `price × qty`, plus the per-unit length surcharge for lengths above 20 inches.
pub fn line_subtotal(unit_price: Decimal, length: &HairLength, quantity: u32) -> Decimal {
    let surcharge = match length.inches() {
        Some(inches) if inches > BASE_LENGTH_INCHES => Decimal::from(inches - BASE_LENGTH_INCHES) * LENGTH_SURCHARGE_PER_INCH,
        _ => Decimal::ZERO,
    };
    (unit_price + surcharge) * Decimal::from(quantity)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub service_fee: Money,
    pub total: Money,
}

impl CheckoutSummary {
    /// Shipping applies only when something is being paid for.
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        let subtotal = Money::etb(subtotal.max(Decimal::ZERO));
        let shipping = if subtotal.amount() > Decimal::ZERO { Money::etb(SHIPPING_FEE) } else { Money::default() };
        let service_fee = subtotal.percent_of(SERVICE_FEE_RATE);
        let total = Money::etb(subtotal.amount() + shipping.amount() + service_fee.amount());
        Self { subtotal, shipping, service_fee, total }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub seller_id: Option<Uuid>,
    pub unit_price: Decimal,
    pub selected_length: HairLength,
    pub selected_color: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { line_subtotal(self.unit_price, &self.selected_length, self.quantity) }

    fn same_variant(&self, product_id: Uuid, length: &HairLength, color: &str) -> bool {
        self.product_id == product_id && &self.selected_length == length && self.selected_color == color
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> u32 { self.lines.iter().fold(0, |n, l| n.saturating_add(l.quantity)) }

    /// Lines with the same product, length and color merge by adding quantities.
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.same_variant(line.product_id, &line.selected_length, &line.selected_color)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Quantities below one are ignored; use [`Cart::remove`] instead.
    pub fn update_quantity(&mut self, product_id: Uuid, length: &HairLength, color: &str, quantity: u32) {
        if quantity < 1 { return; }
        if let Some(line) = self.lines.iter_mut().find(|l| l.same_variant(product_id, length, color)) {
            line.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product_id: Uuid, length: &HairLength, color: &str) {
        self.lines.retain(|l| !l.same_variant(product_id, length, color));
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    pub fn subtotal(&self) -> Decimal { self.lines.iter().map(CartLine::line_total).sum() }

    pub fn summary(&self) -> CheckoutSummary { CheckoutSummary::for_subtotal(self.subtotal()) }
}
