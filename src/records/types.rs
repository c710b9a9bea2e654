//! Record and input types for the resource API.
//!
//! Inputs are trimmed and checked by `validate`, which returns the cleaned
//! input or the first problem found.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Common accessors the store needs for ordering.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::Validation(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A consultation request submitted through the contact form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
    pub submitted_by_agent: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Consultation {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsultation {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    pub message: String,
}

impl NewConsultation {
    pub fn validate(self) -> Result<Self, ApiError> {
        let email = required("email", &self.email)?;
        if !email.contains('@') {
            return Err(ApiError::Validation("email is invalid".into()));
        }
        Ok(Self {
            name: required("name", &self.name)?,
            email,
            company: optional(self.company),
            message: required("message", &self.message)?,
        })
    }

    pub fn into_record(self, submitted_by_agent: bool) -> Consultation {
        Consultation {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            company: self.company,
            message: self.message,
            submitted_by_agent,
            created_at: Utc::now(),
        }
    }
}

/// A company profile that analyses are attached to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub id: Uuid,
    pub company_name: String,
    pub industry: String,
    pub size: Option<String>,
    pub goals: Vec<String>,
    pub submitted_by_agent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for BusinessProfile {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Body of both create and full-replace requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfileInput {
    pub company_name: String,
    pub industry: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl BusinessProfileInput {
    pub fn validate(self) -> Result<Self, ApiError> {
        Ok(Self {
            company_name: required("companyName", &self.company_name)?,
            industry: required("industry", &self.industry)?,
            size: optional(self.size),
            goals: non_empty_items(self.goals),
        })
    }

    pub fn into_record(self, submitted_by_agent: bool) -> BusinessProfile {
        let now = Utc::now();
        BusinessProfile {
            id: Uuid::new_v4(),
            company_name: self.company_name,
            industry: self.industry,
            size: self.size,
            goals: self.goals,
            submitted_by_agent,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields, keeping identity and creation time.
    pub fn apply_to(self, profile: &mut BusinessProfile) {
        profile.company_name = self.company_name;
        profile.industry = self.industry;
        profile.size = self.size;
        profile.goals = self.goals;
        profile.updated_at = Utc::now();
    }
}

/// Result of analysing a business profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub business_profile_id: Uuid,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub score: Option<u8>,
    pub submitted_by_agent: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for AnalysisResult {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    pub business_profile_id: Uuid,
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

impl NewAnalysis {
    pub const MAX_SCORE: u32 = 100;

    pub fn validate(self) -> Result<Self, ApiError> {
        if let Some(score) = self.score {
            if score > Self::MAX_SCORE {
                return Err(ApiError::Validation(format!(
                    "score must be between 0 and {}",
                    Self::MAX_SCORE
                )));
            }
        }
        Ok(Self {
            business_profile_id: self.business_profile_id,
            summary: required("summary", &self.summary)?,
            recommendations: non_empty_items(self.recommendations),
            score: self.score,
        })
    }

    pub fn into_record(self, submitted_by_agent: bool) -> AnalysisResult {
        AnalysisResult {
            id: Uuid::new_v4(),
            business_profile_id: self.business_profile_id,
            summary: self.summary,
            recommendations: self.recommendations,
            // validate() caps the score at 100
            score: self.score.and_then(|s| u8::try_from(s).ok()),
            submitted_by_agent,
            created_at: Utc::now(),
        }
    }
}
