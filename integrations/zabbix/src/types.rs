//! Shared types

use std::fmt;

use serde::{Deserialize, Serialize};
use zbxutil_core::mask_token;

/// Ordered connection targets: one primary, then backups in failover order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    primary: String,
    #[serde(default)]
    backups: Vec<String>,
}

impl Endpoints {
    /// A single endpoint with no failover
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            backups: Vec::new(),
        }
    }

    /// Primary plus backups, tried in the given order
    pub fn with_backups<I, S>(primary: impl Into<String>, backups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary: primary.into(),
            backups: backups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn backups(&self) -> &[String] {
        &self.backups
    }

    /// All endpoints in attempt order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.backups.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        1 + self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Login shared by every endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// An authenticated connection to one endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    endpoint: String,
    token: String,
}

impl Session {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}
