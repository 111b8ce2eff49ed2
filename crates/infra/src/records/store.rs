use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tasksmith_core::{DomainError, Entity, Order, OrderId, ProfileId, User, UserId, UserProfile};

/// Record store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("record store lock poisoned")]
    Poisoned,
}

/// Read/write access to the records the task layer reacts to.
///
/// The application's database owns these rows; implementations adapt it. Inserts
/// here are raw: they do not fire triggers (see `RecordWriter` for that).
pub trait RecordStore: Send + Sync {
    fn insert_user(&self, user: User) -> Result<(), RecordError>;

    /// Fails with `InvariantViolation` when the order's user does not exist.
    fn insert_order(&self, order: Order) -> Result<(), RecordError>;

    /// Fails with `InvariantViolation` when the profile's user does not exist.
    fn insert_profile(&self, profile: UserProfile) -> Result<(), RecordError>;

    fn user(&self, id: UserId) -> Result<Option<User>, RecordError>;
    fn order(&self, id: OrderId) -> Result<Option<Order>, RecordError>;
    fn profile(&self, id: ProfileId) -> Result<Option<UserProfile>, RecordError>;

    /// All users, oldest first.
    fn users(&self) -> Result<Vec<User>, RecordError>;

    /// Remove an order. Jobs already enqueued for it will fail their lookup.
    fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RecordError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn insert_user(&self, user: User) -> Result<(), RecordError> {
        (**self).insert_user(user)
    }

    fn insert_order(&self, order: Order) -> Result<(), RecordError> {
        (**self).insert_order(order)
    }

    fn insert_profile(&self, profile: UserProfile) -> Result<(), RecordError> {
        (**self).insert_profile(profile)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RecordError> {
        (**self).user(id)
    }

    fn order(&self, id: OrderId) -> Result<Option<Order>, RecordError> {
        (**self).order(id)
    }

    fn profile(&self, id: ProfileId) -> Result<Option<UserProfile>, RecordError> {
        (**self).profile(id)
    }

    fn users(&self) -> Result<Vec<User>, RecordError> {
        (**self).users()
    }

    fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RecordError> {
        (**self).delete_order(id)
    }
}

/// Convenience lookups that turn a missing row into `DomainError::NotFound`.
pub trait RecordStoreExt: RecordStore {
    fn require_user(&self, id: UserId) -> Result<User, RecordError> {
        self.user(id)?
            .ok_or_else(|| DomainError::not_found(User::KIND, id).into())
    }

    fn require_order(&self, id: OrderId) -> Result<Order, RecordError> {
        self.order(id)?
            .ok_or_else(|| DomainError::not_found(Order::KIND, id).into())
    }

    fn require_profile(&self, id: ProfileId) -> Result<UserProfile, RecordError> {
        self.profile(id)?
            .ok_or_else(|| DomainError::not_found(UserProfile::KIND, id).into())
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    profiles: HashMap<ProfileId, UserProfile>,
}

/// In-memory record store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RecordError> {
        self.inner.read().map_err(|_| RecordError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RecordError> {
        self.inner.write().map_err(|_| RecordError::Poisoned)
    }

    pub fn order_count(&self) -> Result<usize, RecordError> {
        Ok(self.read()?.orders.len())
    }

    pub fn profile_count(&self) -> Result<usize, RecordError> {
        Ok(self.read()?.profiles.len())
    }

    /// All orders, oldest first.
    pub fn orders(&self) -> Result<Vec<Order>, RecordError> {
        let mut orders: Vec<Order> = self.read()?.orders.values().cloned().collect();
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }
}

fn duplicate<E: Entity>(record: &E) -> RecordError
where
    E::Id: core::fmt::Display,
{
    RecordError::Duplicate {
        kind: E::KIND,
        id: record.id().to_string(),
    }
}

fn unknown_owner(kind: &str, user_id: UserId) -> RecordError {
    DomainError::invariant(format!("{kind} references unknown user {user_id}")).into()
}

impl RecordStore for InMemoryRecordStore {
    fn insert_user(&self, user: User) -> Result<(), RecordError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(duplicate(&user));
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    fn insert_order(&self, order: Order) -> Result<(), RecordError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&order.user_id) {
            return Err(unknown_owner(Order::KIND, order.user_id));
        }
        if tables.orders.contains_key(&order.id) {
            return Err(duplicate(&order));
        }
        tables.orders.insert(order.id, order);
        Ok(())
    }

    fn insert_profile(&self, profile: UserProfile) -> Result<(), RecordError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(unknown_owner(UserProfile::KIND, profile.user_id));
        }
        if tables.profiles.contains_key(&profile.id) {
            return Err(duplicate(&profile));
        }
        tables.profiles.insert(profile.id, profile);
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RecordError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn order(&self, id: OrderId) -> Result<Option<Order>, RecordError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn profile(&self, id: ProfileId) -> Result<Option<UserProfile>, RecordError> {
        Ok(self.read()?.profiles.get(&id).cloned())
    }

    fn users(&self) -> Result<Vec<User>, RecordError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by_key(|u| (u.date_joined, u.id));
        Ok(users)
    }

    fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RecordError> {
        Ok(self.write()?.orders.remove(&id))
    }
}
