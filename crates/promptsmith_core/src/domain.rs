//! crates/promptsmith_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Persisted types carry their storage field names through serde; everything
//! else here is plain data with no I/O.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of free-tier generations allowed per local calendar day.
pub const DEFAULT_DAILY_LIMIT: u32 = 5;

/// Number of non-saved history entries kept under the free tier.
pub const FREE_HISTORY_LIMIT: usize = 10;

//=========================================================================================
// Plan & Limits
//=========================================================================================

/// The subscription level of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
}

impl PlanTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            other => Err(format!("'{}' is not a plan tier (expected free or pro)", other)),
        }
    }
}

/// Quota and retention caps applied to the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub daily_limit: u32,
    pub history_limit: usize,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            history_limit: FREE_HISTORY_LIMIT,
        }
    }
}

/// How many generations are still allowed today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Limited(u32),
}

impl Remaining {
    pub fn is_exhausted(self) -> bool {
        matches!(self, Remaining::Limited(0))
    }

    /// `None` stands for unlimited.
    pub fn as_option(self) -> Option<u32> {
        match self {
            Remaining::Unlimited => None,
            Remaining::Limited(n) => Some(n),
        }
    }
}

//=========================================================================================
// Persisted Records
//=========================================================================================

/// Daily generation counter. A record stamped with a day other than today counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub count: u32,
}

impl UsageRecord {
    pub fn empty(today: NaiveDate) -> Self {
        Self { date: today, count: 0 }
    }

    /// The count that applies on `today`.
    pub fn count_on(&self, today: NaiveDate) -> u32 {
        if self.date == today {
            self.count
        } else {
            0
        }
    }
}

/// One past generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<PresetId>,
    pub input_text: String,
    pub output_text: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub saved: bool,
}

impl HistoryEntry {
    /// Builds a fresh, unsaved entry from a normalized result.
    pub fn new(
        created_at: DateTime<Utc>,
        preset_id: Option<PresetId>,
        input_text: String,
        result: &NormalizedResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            preset_id,
            input_text,
            output_text: result.prompt_text.clone(),
            follow_ups: result.follow_up_questions.clone(),
            saved: false,
        }
    }

    /// Case-insensitive substring match over input and output text.
    pub fn matches_query(&self, needle_lowercase: &str) -> bool {
        if needle_lowercase.is_empty() {
            return true;
        }
        let haystack = format!("{}\n{}", self.input_text, self.output_text).to_lowercase();
        haystack.contains(needle_lowercase)
    }
}

/// Which history tab is being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    Saved,
}

//=========================================================================================
// Generation
//=========================================================================================

/// A display-ready prompt plus any clarifying questions the model asked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NormalizedResult {
    pub prompt_text: String,
    pub follow_up_questions: Vec<String>,
}

/// The user's answer to one of the model's follow-up questions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FollowUpAnswer {
    pub question: String,
    pub answer: String,
}

/// Everything the user submitted for one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationRequest {
    pub input: String,
    pub preset_id: Option<PresetId>,
    pub follow_up: Option<FollowUpAnswer>,
}

impl GenerationRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// The text sent to the collaborator, with any follow-up answer appended.
    pub fn composed_input(&self) -> String {
        let base = self.input.trim();
        match &self.follow_up {
            Some(f) if !f.answer.trim().is_empty() => format!(
                "{}\n\nQ: {}\nA: {}",
                base,
                f.question.trim(),
                f.answer.trim()
            ),
            _ => base.to_string(),
        }
    }
}

/// The observable step of the current generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    #[default]
    Idle,
    Validating,
    QuotaCheck,
    Requesting,
    Normalizing,
    Committing,
}

/// The result of a successful generation attempt.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub entry: HistoryEntry,
    pub result: NormalizedResult,
    pub remaining: Remaining,
}

/// Explicit per-session state handed to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionContext {
    pub plan: PlanTier,
}

impl SessionContext {
    pub fn new(plan: PlanTier) -> Self {
        Self { plan }
    }
}

//=========================================================================================
// Presets
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetId {
    General,
    Writing,
    Coding,
    Study,
    Marketing,
    BusinessPlan,
    Research,
    Career,
}

impl PresetId {
    /// The kebab-case id used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            PresetId::General => "general",
            PresetId::Writing => "writing",
            PresetId::Coding => "coding",
            PresetId::Study => "study",
            PresetId::Marketing => "marketing",
            PresetId::BusinessPlan => "business-plan",
            PresetId::Research => "research",
            PresetId::Career => "career",
        }
    }
}

/// A predefined input template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub id: PresetId,
    pub label: &'static str,
    pub description: &'static str,
    pub template: &'static str,
    pub pro_only: bool,
}

impl Preset {
    pub fn is_available(&self, plan: PlanTier) -> bool {
        !self.pro_only || plan == PlanTier::Pro
    }
}
