//! Bot-wide privilege lists.
//!
//! The lists nest: the owner is implicitly sudo, sudo users are implicitly
//! support, and sudo and support users are implicitly whitelisted.

use std::collections::HashSet;

use rose_core::UserId;

#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    owner: Option<UserId>,
    sudo: HashSet<UserId>,
    support: HashSet<UserId>,
    whitelist: HashSet<UserId>,
}

impl AccessControl {
    pub fn new(owner: Option<UserId>) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn with_sudo(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.sudo.extend(users);
        self
    }

    pub fn with_support(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.support.extend(users);
        self
    }

    pub fn with_whitelist(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.whitelist.extend(users);
        self
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }

    pub fn is_sudo(&self, user: UserId) -> bool {
        self.is_owner(user) || self.sudo.contains(&user)
    }

    pub fn is_support(&self, user: UserId) -> bool {
        self.is_sudo(user) || self.support.contains(&user)
    }

    pub fn is_whitelisted(&self, user: UserId) -> bool {
        self.is_support(user) || self.whitelist.contains(&user)
    }
}
