//! Seed the default wig categories and, optionally, an admin account.
//!
//! Categories are inserted only when the collection is empty. The admin is
//! created from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when both are set and the
//! email is not registered yet.

use anyhow::Result;

use wigvana::config::{self, AppConfig};
use wigvana::publisher::EventPublisher;
use wigvana::services::categories::CreateCategoryRequest;
use wigvana::services::Services;
use wigvana::store;

const DEFAULT_CATEGORIES: [(&str, &str); 6] = [
    ("Synthetic Wigs", "Affordable, low-maintenance wigs made from synthetic fibres."),
    ("Human Hair Wigs", "Natural-looking wigs made from 100% human hair."),
    ("Lace Front Wigs", "Wigs with a sheer lace hairline for a natural look."),
    ("Full Lace Wigs", "Hand-tied full lace caps that can be parted anywhere."),
    ("Headband Wigs", "Glueless wigs attached with a built-in headband."),
    ("Wig Care & Accessories", "Caps, adhesives, brushes and care products."),
];

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    config::init_tracing(config.log_format);

    let services = Services::new(store::open(&config).await?, EventPublisher::disabled());

    let existing = services.categories.count().await?;
    if existing > 0 {
        tracing::info!(existing, "categories already present, skipping");
    } else {
        for (order, (name, description)) in (1..).zip(DEFAULT_CATEGORIES) {
            services
                .categories
                .create(CreateCategoryRequest {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    display_order: Some(order),
                    ..CreateCategoryRequest::default()
                })
                .await?;
        }
        tracing::info!(count = DEFAULT_CATEGORIES.len(), "default categories created");
    }

    let admin_email = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty());
    let admin_password = std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());
    match (admin_email, admin_password) {
        (Some(email), Some(password)) => match services.auth.bootstrap_admin(&email, &password).await? {
            Some(admin) => tracing::info!(user_id = %admin.id, "admin account created"),
            None => tracing::info!(%email, "admin account already exists"),
        },
        _ => tracing::info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin bootstrapped"),
    }
    Ok(())
}
