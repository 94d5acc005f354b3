//! Observers that follow a layout through repartitioning.
//!
//! Fields and particle containers register with the layout they are built
//! on. During [`FieldLayout::repartition`](crate::layout::FieldLayout::repartition)
//! each registered user is handed the new layout before the old vnode
//! tables are dropped, so it can move its per-vnode data across.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use parking_lot::Mutex;

use crate::domain_error::DomainError;
use crate::index::GuardCellSizes;
use crate::layout::field_layout::FieldLayout;

/// Something that stores data laid out by a [`FieldLayout`].
pub trait FieldLayoutUser<const D: usize>: Send {
    /// Called once per repartition with the layout that is about to
    /// replace the current one.
    fn repartition(&mut self, new_layout: &FieldLayout<D>);
}

/// Shared handle to a registered user.
pub type SharedUser<const D: usize> = Arc<Mutex<dyn FieldLayoutUser<D>>>;

/// Process-unique registration ticket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u64);

static NEXT_USER_ID: AtomicU64 = AtomicU64::new(1);

impl UserId {
    fn fresh() -> Self {
        UserId(NEXT_USER_ID.fetch_add(1, Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

struct Registration<const D: usize> {
    id: UserId,
    guards: GuardCellSizes<D>,
    user: SharedUser<D>,
}

/// Ordered list of registered users.
pub struct UserList<const D: usize> {
    users: Vec<Registration<D>>,
}

impl<const D: usize> Default for UserList<D> {
    fn default() -> Self {
        Self { users: Vec::new() }
    }
}

impl<const D: usize> UserList<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Register `user`, remembering the guard cells it asked for.
    pub fn add(&mut self, user: SharedUser<D>, guards: GuardCellSizes<D>) -> UserId {
        let id = UserId::fresh();
        self.users.push(Registration { id, guards, user });
        id
    }

    /// Remove the registration `id`.
    pub fn remove(&mut self, id: UserId) -> Result<SharedUser<D>, DomainError> {
        let pos = self
            .users
            .iter()
            .position(|r| r.id == id)
            .ok_or(DomainError::UnknownUser(id))?;
        Ok(self.users.remove(pos).user)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.users.iter().any(|r| r.id == id)
    }

    /// Guard cells requested by `id`.
    pub fn guards(&self, id: UserId) -> Option<GuardCellSizes<D>> {
        self.users.iter().find(|r| r.id == id).map(|r| r.guards)
    }

    pub fn ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.iter().map(|r| r.id)
    }

    /// Invoke the repartition callback of every user, in registration order.
    pub fn notify_repartition(&self, new_layout: &FieldLayout<D>) {
        for r in &self.users {
            r.user.lock().repartition(new_layout);
        }
    }
}

impl<const D: usize> fmt::Debug for UserList<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.users.iter().map(|r| r.id)).finish()
    }
}
