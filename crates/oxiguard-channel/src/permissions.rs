//! Explicit permission assignments for one channel.
//!
//! Holds only what was assigned; a lookup miss is an error so the channel
//! manager can apply its default-permission fallback in one place.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use oxiguard_core::{ChatUser, ErrorKind, Permission};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("no permission assigned to user {0}")]
    NotFound(ChatUser),
}

impl PermissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PermissionError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// User → level map. Thread-safe via `RwLock`.
#[derive(Debug, Default)]
pub struct PermissionsManager {
    users: RwLock<HashMap<ChatUser, Permission>>,
}

impl PermissionsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly assigned level for `user`.
    pub fn get(&self, user: &ChatUser) -> Result<Permission, PermissionError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users
            .get(user)
            .copied()
            .ok_or_else(|| PermissionError::NotFound(user.clone()))
    }

    /// Assign `level` to `user`, returning the previous assignment if any.
    pub fn set(&self, user: ChatUser, level: Permission) -> Option<Permission> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users.insert(user, level)
    }

    /// All assignments, sorted by username.
    pub fn assignments(&self) -> Vec<(ChatUser, Permission)> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = users.iter().map(|(u, p)| (u.clone(), *p)).collect();
        list.sort();
        list
    }
}
