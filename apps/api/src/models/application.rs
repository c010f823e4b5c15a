use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CareerTrack {
    SoftwareEngineering,
    ProductManagement,
    DataScience,
    SalesforceConsultant,
    SalesMarketingSupport,
    Other,
}

impl CareerTrack {
    pub fn as_str(self) -> &'static str {
        match self {
            CareerTrack::SoftwareEngineering => "software-engineering",
            CareerTrack::ProductManagement => "product-management",
            CareerTrack::DataScience => "data-science",
            CareerTrack::SalesforceConsultant => "salesforce-consultant",
            CareerTrack::SalesMarketingSupport => "sales-marketing-support",
            CareerTrack::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Reviewed,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub copilot_config_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub linkedin_url: Option<String>,
    pub is_in_us: String,
    pub career_track: String,
    pub is_currently_employed: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An application joined with the name of the configuration it references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationWithConfig {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub copilot_config_name: Option<String>,
}
