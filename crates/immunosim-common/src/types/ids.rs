//! Entity identifiers
//!
//! Pathogens and medications are referenced by id everywhere outside the record
//! that owns them, so maps key on these newtypes rather than on the records.

use serde::{Deserialize, Serialize};

use crate::error::EntityError;

/// Identity of a pathogen strain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathogeneId(pub u32);

impl PathogeneId {
    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for PathogeneId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PathogeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identity of a medication
///
/// Never empty; construction through [`MedicamentId::new`] enforces it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MedicamentId(String);

impl MedicamentId {
    /// Create a medication id, rejecting blank strings
    pub fn new(id: impl Into<String>) -> Result<Self, EntityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EntityError::invalid("medication id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MedicamentId {
    type Error = EntityError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<MedicamentId> for String {
    fn from(id: MedicamentId) -> Self {
        id.0
    }
}

impl AsRef<str> for MedicamentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for MedicamentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MedicamentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
