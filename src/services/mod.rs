//! Domain services.
//!
//! Each service owns the repositories it needs and is cheap to clone.
//! Controllers pass whitelisted query structs in; unknown query
//! parameters never reach this layer because serde drops them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, Sort, SortDirection, StoreError};
use crate::{MarketError, Result};

pub mod addresses;
pub mod auth;
pub mod categories;
pub mod checkout;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod reviews;
pub mod sellers;
pub mod stats;
pub mod users;

pub use addresses::AddressService;
pub use auth::AuthService;
pub use categories::CategoryService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use payment_methods::PaymentMethodService;
pub use products::ProductService;
pub use reviews::ReviewService;
pub use sellers::SellerService;
pub use stats::StatsService;
pub use users::UserService;

#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub sellers: SellerService,
    pub products: ProductService,
    pub categories: CategoryService,
    pub orders: OrderService,
    pub reviews: ReviewService,
    pub addresses: AddressService,
    pub payment_methods: PaymentMethodService,
    pub stats: StatsService,
    pub checkout: CheckoutService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        let addresses = AddressService::new(Arc::clone(&store));
        let payment_methods = PaymentMethodService::new(Arc::clone(&store), addresses.clone());
        let orders = OrderService::new(Arc::clone(&store), events.clone());
        let products = ProductService::new(Arc::clone(&store), events.clone());
        Self {
            auth: AuthService::new(Arc::clone(&store)),
            users: UserService::new(Arc::clone(&store), events.clone()),
            sellers: SellerService::new(Arc::clone(&store), events),
            reviews: ReviewService::new(Arc::clone(&store), products.clone()),
            categories: CategoryService::new(Arc::clone(&store)),
            stats: StatsService::new(Arc::clone(&store)),
            checkout: CheckoutService::new(Arc::clone(&store), addresses.clone(), payment_methods.clone(), orders.clone()),
            products,
            orders,
            addresses,
            payment_methods,
        }
    }
}

/// Optional free-text reason for a rejection, cancellation or refund.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

/// Unwrap a lookup or fail with `NotFound`.
pub(crate) fn found<T>(value: Option<T>, entity: &'static str) -> Result<T> {
    value.ok_or(MarketError::NotFound(entity))
}

/// Turn a unique-key collision into a user-facing conflict.
pub(crate) fn conflict_as(message: &'static str) -> impl FnOnce(StoreError) -> MarketError {
    move |e| match e {
        StoreError::Conflict { .. } => MarketError::Conflict(message.to_string()),
        other => other.into(),
    }
}

/// Resolve a client sort request against a whitelist of sortable fields.
///
/// Accepts `field`, `-field` (descending) and snake_case names. Anything not
/// whitelisted falls back to newest first.
pub(crate) fn resolve_sort(sort_by: Option<&str>, order: Option<SortDirection>, allowed: &[&str]) -> Sort {
    let Some(raw) = sort_by.map(str::trim).filter(|s| !s.is_empty()) else {
        return Sort::newest_first();
    };
    let (raw, prefixed_desc) = match raw.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let field = camel_case(raw);
    if !allowed.contains(&field.as_str()) {
        return Sort::newest_first();
    }
    let direction = match (order, prefixed_desc) {
        (Some(direction), _) => direction,
        (None, true) => SortDirection::Desc,
        (None, false) => SortDirection::Asc,
    };
    Sort { field, direction }
}

fn camel_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut upper = false;
    for c in raw.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Non-blank string check for `#[validate(custom = "...")]`.
pub(crate) fn not_blank(value: &str) -> std::result::Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("blank");
        error.message = Some("is required".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["createdAt", "price", "name"];

    #[test]
    fn test_resolve_sort() {
        assert_eq!(resolve_sort(None, None, FIELDS), Sort::newest_first());
        assert_eq!(resolve_sort(Some("-createdAt"), None, FIELDS), Sort::desc("createdAt"));
        assert_eq!(resolve_sort(Some("created_at"), Some(SortDirection::Asc), FIELDS), Sort::asc("createdAt"));
        assert_eq!(resolve_sort(Some("price"), None, FIELDS), Sort::asc("price"));
        assert_eq!(resolve_sort(Some("passwordHash"), None, FIELDS), Sort::newest_first());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("  ").is_err());
        assert!(not_blank("Addis Ababa").is_ok());
    }
}
