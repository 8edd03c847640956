//! Outcome of resolving a postal code to a locality

use serde::{Deserialize, Serialize};

/// Result of a location lookup. A found locality is never empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LocationResult {
    Found(String),
    NotFound,
}

impl LocationResult {
    /// Build a result from a provider locality, treating blank names as not found
    #[must_use]
    pub fn from_locality(locality: Option<String>) -> Self {
        match locality {
            Some(name) if !name.trim().is_empty() => Self::Found(name),
            _ => Self::NotFound,
        }
    }

    #[must_use]
    pub fn locality(&self) -> Option<&str> {
        match self {
            Self::Found(name) => Some(name),
            Self::NotFound => None,
        }
    }
}
