//! `tasksmith-core` — domain records and identifiers.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).
//! Persistence of these records belongs to the surrounding web application; the
//! task layer only reads them.

pub mod entity;
pub mod error;
pub mod id;
pub mod record;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProfileId, UserId};
pub use record::{Order, User, UserProfile};
pub use value_object::{Money, ValueObject};
