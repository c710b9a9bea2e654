//! Consultation, business-profile and analysis records.

pub mod store;
pub mod types;

pub use store::{Collection, Store};
pub use types::{
    AnalysisResult, BusinessProfile, BusinessProfileInput, Consultation, NewAnalysis,
    NewConsultation, Record,
};
