//! Aggregates module
pub mod address;
pub mod cart;
pub mod category;
pub mod order;
pub mod payment_method;
pub mod product;
pub mod review;
pub mod seller;
pub mod user;

pub use address::{Address, AddressType};
pub use cart::{line_subtotal, Cart, CartLine, CheckoutSummary};
pub use category::Category;
pub use order::{Actor, Order, OrderItem, OrderRefs, OrderStatus, StatusChange};
pub use payment_method::{PaymentMethod, PaymentType};
pub use product::{ApprovalStatus, Product};
pub use review::Review;
pub use seller::{ApplicationStatus, SellerApplication};
pub use user::{AccountStatus, Role, Session, User, UserProfile};

/// A lifecycle change that is not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError { pub entity: &'static str, pub from: String, pub to: String }

impl TransitionError {
    pub fn new(entity: &'static str, from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self { entity, from: from.to_string(), to: to.to_string() }
    }
}

impl std::error::Error for TransitionError {}
impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cannot change {} from {} to {}", self.entity, self.from, self.to)
    }
}

impl From<TransitionError> for crate::MarketError {
    fn from(e: TransitionError) -> Self {
        Self::InvalidTransition { entity: e.entity, from: e.from, to: e.to }
    }
}
