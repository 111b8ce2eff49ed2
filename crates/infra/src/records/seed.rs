//! Bulk seeding of users, profiles and orders for local testing.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::info;

use tasksmith_core::{Money, Order, User, UserProfile};

use super::store::{RecordError, RecordStore};

/// Image path given to every seeded profile, relative to the media root.
pub const DEFAULT_PROFILE_IMAGE: &str = "profile_images/default.png";

const PRODUCTS: &[&str] = &[
    "lamp", "chair", "kettle", "notebook", "backpack", "monitor", "headphones", "mug",
];

/// What a seeding run created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub profiles: usize,
    pub orders: usize,
}

/// Create `users` users, one profile each and `orders_per_user` orders each.
///
/// Writes go straight to the store: bulk inserts do not fire on-create
/// triggers, so no welcome emails, invoices or image jobs are enqueued.
pub fn seed_bulk(
    store: &dyn RecordStore,
    users: usize,
    orders_per_user: usize,
) -> Result<SeedSummary, RecordError> {
    seed_bulk_with(store, users, orders_per_user, &mut rand::rng())
}

/// [`seed_bulk`] drawing products and prices from `rng`.
pub fn seed_bulk_with<R: Rng + ?Sized>(
    store: &dyn RecordStore,
    users: usize,
    orders_per_user: usize,
    rng: &mut R,
) -> Result<SeedSummary, RecordError> {
    info!(users, orders_per_user, "seeding users with profiles and orders");

    let mut summary = SeedSummary {
        users: 0,
        profiles: 0,
        orders: 0,
    };

    for n in 0..users {
        let suffix = &uuid::Uuid::now_v7().simple().to_string()[24..];
        let username = format!("user_{n}_{suffix}");
        let user = User::new(username.clone(), format!("{username}@example.com"))?;
        store.insert_user(user.clone())?;
        summary.users += 1;

        store.insert_profile(UserProfile::new(
            user.id,
            Some(DEFAULT_PROFILE_IMAGE.to_string()),
        ))?;
        summary.profiles += 1;

        for _ in 0..orders_per_user {
            let product = PRODUCTS.choose(rng).copied().unwrap_or("item");
            store.insert_order(Order::new(user.id, product, random_price(rng)))?;
            summary.orders += 1;
        }
    }

    info!(
        users = summary.users,
        profiles = summary.profiles,
        orders = summary.orders,
        "seeding complete"
    );
    Ok(summary)
}

/// A price between 10.00 and 500.00.
fn random_price<R: Rng + ?Sized>(rng: &mut R) -> Money {
    Money::from_cents(rng.random_range(1_000..=50_000))
}
