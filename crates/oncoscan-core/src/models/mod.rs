//! Domain models for the oncoscan system.

mod clinician;
mod patient;
mod record;

pub use clinician::*;
pub use patient::*;
pub use record::*;

pub use oncoscan_inference::InferenceResult;
