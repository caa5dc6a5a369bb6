//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::builder::compute_age;

/// Patient gender as entered on the intake form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// Patient demographics captured before an analysis.
///
/// `age` is derived from `date_of_birth` and only changes through
/// [`PatientProfile::set_date_of_birth`] or [`PatientProfile::refresh_age`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,
    /// Age in whole years, derived from `date_of_birth`
    age: Option<u32>,
    /// Gender, no default
    pub gender: Option<Gender>,
    /// External patient identifier (optional)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub patient_id: Option<String>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

impl PatientProfile {
    /// Create a profile with names only; the rest is filled in by the form.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    /// Set the date of birth and recompute the age as of `as_of`.
    pub fn set_date_of_birth(&mut self, date_of_birth: Option<NaiveDate>, as_of: NaiveDate) {
        self.date_of_birth = date_of_birth;
        self.refresh_age(as_of);
    }

    /// Recompute the derived age as of `as_of`.
    pub fn refresh_age(&mut self, as_of: NaiveDate) {
        self.age = self.date_of_birth.map(|dob| compute_age(dob, as_of));
    }

    /// Derived age in whole years.
    pub fn age(&self) -> Option<u32> {
        self.age
    }

    /// Builder-style gender setter.
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Builder-style date of birth setter.
    pub fn with_date_of_birth(mut self, date_of_birth: NaiveDate, as_of: NaiveDate) -> Self {
        self.set_date_of_birth(Some(date_of_birth), as_of);
        self
    }

    /// Builder-style external identifier setter.
    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    /// All required fields are present.
    pub fn is_complete(&self) -> bool {
        !self.first_name.trim().is_empty()
            && !self.last_name.trim().is_empty()
            && self.date_of_birth.is_some()
            && self.gender.is_some()
    }

    /// "First Last" display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}
