//! Domain records the task layer reacts to.
//!
//! Records are owned by the web application's database. Here they are plain
//! data: the write path creates them once and the task handlers read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{OrderId, ProfileId, UserId};
use crate::value_object::Money;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> DomainResult<Self> {
        let username = username.into();
        let email = email.into();

        if username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation(format!(
                "email address is malformed: {email}"
            )));
        }

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            date_joined: Utc::now(),
        })
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// First and last name separated by a space, trimmed. Empty when neither is set.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// A purchase made by a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_name: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: UserId, product_name: impl Into<String>, price: Money) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            product_name: product_name.into(),
            price,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Order {
    type Id = OrderId;
    const KIND: &'static str = "order";

    fn id(&self) -> &OrderId {
        &self.id
    }
}

/// Per-user profile holding an uploaded image.
///
/// `image` is relative to the configured media root
/// (e.g. `profile_images/avatar.png`) and is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: UserId, image: Option<String>) -> Self {
        // An empty upload field is the same as no image.
        let image = image.filter(|path| !path.trim().is_empty());
        Self {
            id: ProfileId::new(),
            user_id,
            image,
            created_at: Utc::now(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

impl Entity for UserProfile {
    type Id = ProfileId;
    const KIND: &'static str = "user profile";

    fn id(&self) -> &ProfileId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_username_and_bad_email() {
        assert!(matches!(
            User::new("  ", "a@example.com"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            User::new("alice", "alice.example.com"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn full_name_is_trimmed() {
        let user = User::new("alice", "alice@example.com").unwrap();
        assert_eq!(user.full_name(), "");

        let user = user.with_name("Alice", "");
        assert_eq!(user.full_name(), "Alice");

        let user = user.with_name("Alice", "Liddell");
        assert_eq!(user.full_name(), "Alice Liddell");
    }

    #[test]
    fn blank_profile_image_counts_as_absent() {
        let user = User::new("bob", "bob@example.com").unwrap();
        assert!(!UserProfile::new(user.id, Some(String::new())).has_image());
        assert!(!UserProfile::new(user.id, None).has_image());
        assert!(UserProfile::new(user.id, Some("profile_images/bob.png".into())).has_image());
    }
}
