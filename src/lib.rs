//! WigVana Marketplace
//!
//! Two-sided wig marketplace: public storefront, buyer checkout, seller
//! product and order management, and an administrative back-office.
//!
//! ## Features
//! - Product catalog with seller submissions and admin approval
//! - Buyer addresses, payment methods and order placement
//! - Seller order fulfilment and admin order moderation
//! - Reviews with moderation
//! - Dashboard statistics
//! - Typed HTTP client with local session and cart state
//! - Client-side checkout workflow

use thiserror::Error;

pub mod api;
pub mod checkout;
pub mod client;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod services;
pub mod store;

use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot change {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for MarketError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {detail}")
            })
            .collect();
        fields.sort();
        Self::Validation(fields.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
