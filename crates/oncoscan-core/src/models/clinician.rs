//! Clinician identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the authenticated clinician.
///
/// Every history operation is scoped by one of these. The value is trimmed
/// and never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClinicianId(String);

impl ClinicianId {
    /// Resolve an identity from a login name.
    pub fn new(username: impl AsRef<str>) -> Option<Self> {
        let trimmed = username.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClinicianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClinicianId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| "clinician identity cannot be blank".to_string())
    }
}

impl From<ClinicianId> for String {
    fn from(id: ClinicianId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identity_rejected() {
        assert!(ClinicianId::new("").is_none());
        assert!(ClinicianId::new("   ").is_none());
    }

    #[test]
    fn test_identity_trimmed() {
        let id = ClinicianId::new("  alice ").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn test_serde_rejects_blank() {
        assert!(serde_json::from_str::<ClinicianId>(r#""  ""#).is_err());
        let id: ClinicianId = serde_json::from_str(r#""bob""#).unwrap();
        assert_eq!(id.as_str(), "bob");
    }
}
