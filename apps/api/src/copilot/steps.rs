//! Wizard steps and the payload shape each one accepts.
//!
//! Payloads arrive as free-form JSON and are checked here before the
//! manager touches storage. A payload that parses is re-serialized, so the
//! stored column always has the canonical shape: defaults filled in, absent
//! optional fields left out.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// The four wizard slots, in the order the client fills them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    JobSetup,
    Filters,
    Screening,
    FinalConfig,
}

impl WizardStep {
    pub fn from_number(step: i64) -> Result<Self, AppError> {
        match step {
            1 => Ok(WizardStep::JobSetup),
            2 => Ok(WizardStep::Filters),
            3 => Ok(WizardStep::Screening),
            4 => Ok(WizardStep::FinalConfig),
            other => Err(AppError::InvalidStep(other)),
        }
    }

    pub fn number(self) -> i32 {
        match self {
            WizardStep::JobSetup => 1,
            WizardStep::Filters => 2,
            WizardStep::Screening => 3,
            WizardStep::FinalConfig => 4,
        }
    }

    pub fn slot_name(self) -> &'static str {
        match self {
            WizardStep::JobSetup => "job_setup",
            WizardStep::Filters => "filters",
            WizardStep::Screening => "screening_data",
            WizardStep::FinalConfig => "final_config",
        }
    }

    /// Parses `payload` as this step's slot and returns its canonical JSON.
    pub fn validate(self, payload: Value) -> Result<Value, AppError> {
        match self {
            WizardStep::JobSetup => canonicalize::<JobSetup>(self, payload),
            WizardStep::Filters => {
                let filters: Filters = parse_slot(self, payload)?;
                filters.check()?;
                to_value(&filters)
            }
            WizardStep::Screening => canonicalize::<ScreeningData>(self, payload),
            WizardStep::FinalConfig => canonicalize::<FinalConfig>(self, payload),
        }
    }
}

fn parse_slot<T: DeserializeOwned>(step: WizardStep, payload: Value) -> Result<T, AppError> {
    if !payload.is_object() {
        return Err(AppError::Validation(format!(
            "{} must be a JSON object",
            step.slot_name()
        )));
    }
    serde_json::from_value(payload)
        .map_err(|e| AppError::Validation(format!("Invalid {}: {e}", step.slot_name())))
}

fn canonicalize<T: DeserializeOwned + Serialize>(
    step: WizardStep,
    payload: Value,
) -> Result<Value, AppError> {
    let parsed: T = parse_slot(step, payload)?;
    to_value(&parsed)
}

fn to_value<T: Serialize>(slot: &T) -> Result<Value, AppError> {
    serde_json::to_value(slot).map_err(|e| AppError::Internal(e.into()))
}

// ────────────────────────────────────────────────────────────────────────────
// Step 1: job setup
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Fulltime,
    Parttime,
    Contractor,
    Internship,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSetup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_location_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub onsite_locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_types: Vec<JobType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_titles: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Step 2: filters
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalaryRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filters {
    #[serde(default = "default_true")]
    pub increase_job_match: bool,
    #[serde(default = "default_job_match_level")]
    pub job_match_level: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seniority_levels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default = "default_true")]
    pub include_unknown_industry: bool,
    #[serde(default)]
    pub show_advanced_filters: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_radius: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_companies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
}

fn default_true() -> bool {
    true
}

fn default_job_match_level() -> String {
    "High".to_string()
}

impl Filters {
    fn check(&self) -> Result<(), AppError> {
        if let Some(SalaryRange {
            min: Some(min),
            max: Some(max),
            ..
        }) = &self.salary_range
        {
            if min > max {
                return Err(AppError::Validation(format!(
                    "filters.salary_range.min ({min}) exceeds max ({max})"
                )));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Step 3: screening
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResumeFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreeningQuestion {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_authorization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub willing_to_relocate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsorship_required: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreeningData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_questions: Vec<ScreeningQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<WorkPreferences>,
}

// ────────────────────────────────────────────────────────────────────────────
// Step 4: final configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    #[default]
    AutoApply,
    ReviewFirst,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SentenceLength {
    ShortConcise,
    #[default]
    BalancedMix,
    DetailedComprehensive,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    ProfessionalFormal,
    #[default]
    NeutralCasual,
    EnthusiasticEnergetic,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VocabularyComplexity {
    #[default]
    SimpleEveryday,
    ProfessionalStandard,
    AdvancedSophisticated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notifications {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub in_app: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalConfig {
    #[serde(default)]
    pub selected_mode: ApplyMode,
    #[serde(default)]
    pub sentence_length: SentenceLength,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub vocabulary_complexity: VocabularyComplexity,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Notifications>,
}
