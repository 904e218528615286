//! Value Objects for the marketplace

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every price on the platform is quoted in.
pub const CURRENCY: &str = "ETB";

/// URL slug value object, unique per collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(SlugError::Empty); }
        if value.len() > 120 { return Err(SlugError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(value))
    }

    /// Derive a slug from a display name: lowercase, runs of anything that is
    /// not alphanumeric collapse into a single `-`.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        while slug.ends_with('-') { slug.pop(); }
        Self::new(slug)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "slug is empty"),
            Self::TooLong => write!(f, "slug is too long"),
            Self::InvalidCharacter => write!(f, "slug may only contain letters, digits and '-'"),
        }
    }
}

/// Amount in a named currency. Every amount on the platform is in [`CURRENCY`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn etb(amount: Decimal) -> Self { Self { amount, currency: CURRENCY.to_string() } }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }
    /// Scale by a rate such as `0.05` for a 5% fee.
    pub fn percent_of(&self, rate: Decimal) -> Money { Self { amount: self.amount * rate, currency: self.currency.clone() } }
}

impl Default for Money { fn default() -> Self { Self::etb(Decimal::ZERO) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.currency)
    }
}

/// Selected wig length as chosen on a product page, e.g. `"22"` or `"22 inch"`.
///
/// Only the leading digits carry meaning; anything unparseable has no length.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HairLength(String);

impl HairLength {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    pub fn inches(&self) -> Option<u32> {
        let digits: String = self.0.trim_start().chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}

impl From<&str> for HairLength {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl fmt::Display for HairLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
