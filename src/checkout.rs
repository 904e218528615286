//! Client-side checkout.
//!
//! Turns the signed-in buyer's cart and a shipping form into four API calls:
//! shipping address, billing address, payment method, order. A failing call
//! stops the sequence. Records created by earlier calls are left in place and
//! the cart is kept so the buyer can try again.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{CartStore, ClientError, MarketplaceApi, StorageError};
use crate::domain::aggregates::{AddressType, CheckoutSummary, Order, PaymentType};
use crate::services::addresses::CreateAddressRequest;
use crate::services::orders::{CreateOrderRequest, OrderItemRequest, DEFAULT_SHIPPING_METHOD};
use crate::services::payment_methods::CreatePaymentMethodRequest;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";
pub const FALLBACK_MESSAGE: &str = "Failed to place order";
pub const ORDER_NOTE: &str = "Placed via WigVana Web";

/// Shipping details entered at checkout.
#[derive(Clone, Debug, PartialEq)]
pub struct ShippingForm {
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state_province_region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub payment_type: PaymentType,
}

impl Default for ShippingForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            address_line1: String::new(),
            address_line2: None,
            city: String::new(),
            state_province_region: "Addis Ababa".to_string(),
            postal_code: "1000".to_string(),
            country: "ET".to_string(),
            phone: String::new(),
            payment_type: PaymentType::Cod,
        }
    }
}

impl ShippingForm {
    fn is_complete(&self) -> bool {
        [&self.first_name, &self.address_line1, &self.city, &self.phone].iter().all(|f| !f.trim().is_empty())
    }

    fn address(&self, address_type: AddressType) -> CreateAddressRequest {
        let contact_name = format!("{} {}", self.first_name.trim(), self.last_name.trim()).trim().to_string();
        CreateAddressRequest {
            address_line1: self.address_line1.trim().to_string(),
            address_line2: self.address_line2.clone().filter(|l| !l.trim().is_empty()),
            city: self.city.trim().to_string(),
            state_province_region: self.state_province_region.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            contact_name,
            contact_phone: self.phone.trim().to_string(),
            address_type,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutStep {
    ShippingAddress,
    BillingAddress,
    PaymentMethod,
    Order,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ShippingAddress => "shipping address",
            Self::BillingAddress => "billing address",
            Self::PaymentMethod => "payment method",
            Self::Order => "order",
        })
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("required shipping fields are missing")]
    MissingFields,

    #[error("cart is empty")]
    EmptyCart,

    #[error("creating the {step} failed: {source}")]
    Step {
        step: CheckoutStep,
        #[source]
        source: ClientError,
    },

    #[error("cart could not be read: {0}")]
    Cart(#[from] StorageError),
}

impl CheckoutError {
    /// Text to show the buyer.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingFields => REQUIRED_FIELDS_MESSAGE.to_string(),
            Self::EmptyCart => EMPTY_CART_MESSAGE.to_string(),
            Self::Step { source, .. } => source.server_message().unwrap_or(FALLBACK_MESSAGE).to_string(),
            Self::Cart(_) => FALLBACK_MESSAGE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrderConfirmation {
    pub order: Order,
    /// What the buyer was shown before placing the order.
    pub summary: CheckoutSummary,
}

pub struct CheckoutWorkflow<'a, A: MarketplaceApi + ?Sized> {
    api: &'a A,
    carts: &'a CartStore,
}

impl<'a, A: MarketplaceApi + ?Sized> CheckoutWorkflow<'a, A> {
    pub fn new(api: &'a A, carts: &'a CartStore) -> Self {
        Self { api, carts }
    }

    pub async fn place_order(&self, user_id: Uuid, form: &ShippingForm) -> Result<OrderConfirmation, CheckoutError> {
        if !form.is_complete() {
            return Err(CheckoutError::MissingFields);
        }
        let cart = self.carts.load(user_id)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let summary = cart.summary();

        let shipping = self
            .api
            .create_address(&form.address(AddressType::Shipping))
            .await
            .map_err(|e| step_failed(CheckoutStep::ShippingAddress, e))?;
        tracing::debug!(address_id = %shipping.id, "shipping address created");

        let billing = self
            .api
            .create_address(&form.address(AddressType::Billing))
            .await
            .map_err(|e| step_failed(CheckoutStep::BillingAddress, e))?;
        tracing::debug!(address_id = %billing.id, "billing address created");

        let payment = self
            .api
            .create_payment_method(&CreatePaymentMethodRequest {
                payment_token: format!("tok_demo_{}", Utc::now().timestamp_millis()),
                payment_type: form.payment_type,
                billing_address_id: billing.id,
                is_default: true,
            })
            .await
            .map_err(|e| step_failed(CheckoutStep::PaymentMethod, e))?;
        tracing::debug!(payment_method_id = %payment.id, "payment method created");

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderItemRequest {
                product_id: line.product_id,
                quantity: line.quantity,
                selected_length: line.selected_length.clone(),
                selected_color: line.selected_color.clone(),
            })
            .collect();
        let order = self
            .api
            .create_order(&CreateOrderRequest {
                shipping_address_id: shipping.id,
                billing_address_id: billing.id,
                payment_method_id: payment.id,
                shipping_method: DEFAULT_SHIPPING_METHOD.to_string(),
                notes_by_buyer: Some(ORDER_NOTE.to_string()),
                items,
            })
            .await
            .map_err(|e| step_failed(CheckoutStep::Order, e))?;
        tracing::debug!(order_id = %order.id, "order placed");

        // The order exists at this point; a stale cart is not worth failing over.
        if let Err(e) = self.carts.clear(user_id) {
            tracing::warn!(error = %e, %user_id, "could not clear cart after checkout");
        }
        Ok(OrderConfirmation { order, summary })
    }
}

fn step_failed(step: CheckoutStep, source: ClientError) -> CheckoutError {
    tracing::warn!(%step, error = %source, "checkout step failed");
    CheckoutError::Step { step, source }
}
