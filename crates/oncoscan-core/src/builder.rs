//! Record construction: age derivation, intake validation and snapshotting.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{ClinicianId, DiagnosticRecord, ImageAttachment, InferenceResult, PatientProfile};

/// A single reason a submission cannot proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("patient first name is required")]
    MissingFirstName,

    #[error("patient last name is required")]
    MissingLastName,

    #[error("patient date of birth is required")]
    MissingDateOfBirth,

    #[error("patient date of birth {0} is in the future")]
    DateOfBirthInFuture(NaiveDate),

    #[error("patient gender must be selected")]
    MissingGender,

    #[error("an image must be selected")]
    MissingImage,

    #[error("selected image cannot be analyzed: {0}")]
    InvalidImage(String),

    #[error("inference result is invalid: {0}")]
    InvalidResult(String),
}

/// Every reason a submission was rejected, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Whole years between `date_of_birth` and `as_of`.
///
/// The year difference is decremented when the birthday has not yet occurred
/// in the reference year. A birth date after `as_of` yields 0.
pub fn compute_age(date_of_birth: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= date_of_birth {
        return 0;
    }
    let mut age = as_of.year() - date_of_birth.year();
    if (as_of.month(), as_of.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Check the profile's required fields. `patient_id` is never checked.
pub fn validate(profile: &PatientProfile, as_of: NaiveDate) -> Result<(), ValidationErrors> {
    profile_errors(profile, as_of).into_result()
}

/// Check the profile and the image selection together.
///
/// This is the local gate that runs before any inference call.
pub fn validate_submission(
    profile: &PatientProfile,
    image: Option<&ImageAttachment>,
    as_of: NaiveDate,
) -> Result<(), ValidationErrors> {
    let mut errors = profile_errors(profile, as_of);
    if image.map(|i| i.name.trim().is_empty()).unwrap_or(true) {
        errors.0.push(ValidationError::MissingImage);
    }
    errors.into_result()
}

fn profile_errors(profile: &PatientProfile, as_of: NaiveDate) -> ValidationErrors {
    let mut errors = Vec::new();
    if profile.first_name.trim().is_empty() {
        errors.push(ValidationError::MissingFirstName);
    }
    if profile.last_name.trim().is_empty() {
        errors.push(ValidationError::MissingLastName);
    }
    match profile.date_of_birth {
        None => errors.push(ValidationError::MissingDateOfBirth),
        Some(dob) if dob > as_of => errors.push(ValidationError::DateOfBirthInFuture(dob)),
        Some(_) => {}
    }
    if profile.gender.is_none() {
        errors.push(ValidationError::MissingGender);
    }
    ValidationErrors(errors)
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant (for testing).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Combines a patient profile, an inference result and the analyzed image
/// into a [`DiagnosticRecord`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder<C: Clock = SystemClock> {
    clock: C,
}

impl RecordBuilder<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> RecordBuilder<C> {
    /// Builder reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Current time according to this builder's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Build a record from snapshots of `profile` and `result`.
    ///
    /// The stored profile's age is recomputed against the record date.
    pub fn build(
        &self,
        profile: &PatientProfile,
        result: &InferenceResult,
        image: Option<&ImageAttachment>,
        doctor: &ClinicianId,
    ) -> Result<DiagnosticRecord, ValidationErrors> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut errors = validate_submission(profile, image, today)
            .err()
            .unwrap_or_default();
        if let Err(e) = result.validate() {
            errors.0.push(ValidationError::InvalidResult(e.to_string()));
        }
        if !errors.is_empty() {
            tracing::debug!(reasons = %errors, "record build rejected");
            return Err(errors);
        }

        let Some(image) = image else {
            return Err(ValidationErrors(vec![ValidationError::MissingImage]));
        };

        let mut patient = profile.clone();
        patient.refresh_age(today);

        Ok(DiagnosticRecord {
            id: uuid::Uuid::now_v7().to_string(),
            date: now,
            patient,
            result: result.clone(),
            image_name: image.name.clone(),
            image_preview: image.preview.clone(),
            doctor: doctor.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn complete_profile() -> PatientProfile {
        PatientProfile::new("Awa", "Diop")
            .with_date_of_birth(date(1980, 7, 20), date(2024, 1, 1))
            .with_gender(Gender::Female)
    }

    fn negative_result() -> InferenceResult {
        InferenceResult {
            label: 0,
            prediction: "Tissu sain".into(),
            probability_cancer: 0.12,
            confidence: 0.97,
        }
    }

    fn fixed_builder() -> RecordBuilder<FixedClock> {
        RecordBuilder::with_clock(FixedClock("2024-05-01T09:30:00Z".parse().unwrap()))
    }

    #[test]
    fn test_compute_age_birthday_boundary() {
        assert_eq!(compute_age(date(2000, 3, 15), date(2020, 3, 14)), 19);
        assert_eq!(compute_age(date(2000, 3, 15), date(2020, 3, 15)), 20);
        assert_eq!(compute_age(date(2000, 3, 15), date(2020, 2, 20)), 19);
    }

    #[test]
    fn test_compute_age_edges() {
        assert_eq!(compute_age(date(2000, 3, 15), date(2000, 3, 15)), 0);
        assert_eq!(compute_age(date(2000, 3, 15), date(2001, 3, 15)), 1);
        assert_eq!(compute_age(date(2000, 3, 15), date(1999, 1, 1)), 0);
    }

    #[test]
    fn test_compute_age_leap_day() {
        assert_eq!(compute_age(date(2000, 2, 29), date(2021, 2, 28)), 20);
        assert_eq!(compute_age(date(2000, 2, 29), date(2021, 3, 1)), 21);
        assert_eq!(compute_age(date(2000, 2, 29), date(2024, 2, 29)), 24);
    }

    #[test]
    fn test_validate_complete_profile() {
        assert!(validate(&complete_profile(), date(2024, 1, 1)).is_ok());
        let with_id = complete_profile().with_patient_id("HPD-1");
        assert!(validate(&with_id, date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_validate_each_missing_field() {
        let today = date(2024, 1, 1);

        let mut p = complete_profile();
        p.first_name.clear();
        assert_eq!(
            validate(&p, today).unwrap_err().0,
            vec![ValidationError::MissingFirstName]
        );

        let mut p = complete_profile();
        p.last_name = "  ".into();
        assert_eq!(
            validate(&p, today).unwrap_err().0,
            vec![ValidationError::MissingLastName]
        );

        let mut p = complete_profile();
        p.set_date_of_birth(None, today);
        assert_eq!(
            validate(&p, today).unwrap_err().0,
            vec![ValidationError::MissingDateOfBirth]
        );

        let mut p = complete_profile();
        p.gender = None;
        assert_eq!(
            validate(&p, today).unwrap_err().0,
            vec![ValidationError::MissingGender]
        );
    }

    #[test]
    fn test_validate_collects_all_reasons() {
        let errors = validate(&PatientProfile::default(), date(2024, 1, 1)).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.to_string().contains("gender"));
    }

    #[test]
    fn test_validate_future_date_of_birth() {
        let p = complete_profile().with_date_of_birth(date(2030, 1, 1), date(2024, 1, 1));
        let errors = validate(&p, date(2024, 1, 1)).unwrap_err();
        assert!(errors.contains(&ValidationError::DateOfBirthInFuture(date(2030, 1, 1))));
    }

    #[test]
    fn test_validate_submission_requires_image() {
        let errors = validate_submission(&complete_profile(), None, date(2024, 1, 1)).unwrap_err();
        assert_eq!(errors.0, vec![ValidationError::MissingImage]);

        let image = ImageAttachment::name_only("slide.png");
        assert!(validate_submission(&complete_profile(), Some(&image), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_build_snapshots_inputs() {
        let builder = fixed_builder();
        let doctor = ClinicianId::new("alice").unwrap();
        let mut profile = complete_profile();
        let image = ImageAttachment::name_only("slide.png");

        let record = builder
            .build(&profile, &negative_result(), Some(&image), &doctor)
            .unwrap();

        profile.first_name = "Changed".into();
        profile.gender = Some(Gender::Male);

        assert_eq!(record.patient.first_name, "Awa");
        assert_eq!(record.patient.gender, Some(Gender::Female));
        assert_eq!(record.patient.age(), Some(43));
        assert_eq!(record.date, builder.now());
        assert_eq!(record.doctor, doctor);
        assert_eq!(record.image_name, "slide.png");
        assert_eq!(record.result, negative_result());
        assert_eq!(record.id.len(), 36);
    }

    #[test]
    fn test_build_ids_are_unique() {
        let builder = fixed_builder();
        let doctor = ClinicianId::new("alice").unwrap();
        let image = ImageAttachment::name_only("slide.png");

        let a = builder
            .build(&complete_profile(), &negative_result(), Some(&image), &doctor)
            .unwrap();
        let b = builder
            .build(&complete_profile(), &negative_result(), Some(&image), &doctor)
            .unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_build_rejects_incomplete() {
        let builder = fixed_builder();
        let doctor = ClinicianId::new("alice").unwrap();

        let errors = builder
            .build(&PatientProfile::new("Awa", ""), &negative_result(), None, &doctor)
            .unwrap_err();
        assert!(errors.contains(&ValidationError::MissingLastName));
        assert!(errors.contains(&ValidationError::MissingImage));
    }

    #[test]
    fn test_build_rejects_out_of_range_result() {
        let builder = fixed_builder();
        let doctor = ClinicianId::new("alice").unwrap();
        let image = ImageAttachment::name_only("slide.png");
        let mut result = negative_result();
        result.confidence = 1.5;

        let errors = builder
            .build(&complete_profile(), &result, Some(&image), &doctor)
            .unwrap_err();
        assert!(matches!(errors.0[0], ValidationError::InvalidResult(_)));
    }

    proptest! {
        #[test]
        fn prop_age_non_negative_and_bounded(
            dob_days in 0i64..40_000,
            span in 0i64..40_000,
        ) {
            let base = date(1900, 1, 1);
            let dob = base + chrono::Duration::days(dob_days);
            let as_of = dob + chrono::Duration::days(span);
            let age = compute_age(dob, as_of);
            let years = (as_of.year() - dob.year()) as u32;
            prop_assert!(age == years || age + 1 == years);
        }

        #[test]
        fn prop_age_increments_on_birthday(year in 1901i32..2100, month in 1u32..=12, day in 1u32..=28) {
            let dob = date(1900, month, day);
            let birthday = date(year, month, day);
            let eve = birthday.pred_opt().unwrap();
            let expected = (year - 1900) as u32;
            prop_assert_eq!(compute_age(dob, birthday), expected);
            prop_assert_eq!(compute_age(dob, eve), expected - 1);
        }
    }
}
