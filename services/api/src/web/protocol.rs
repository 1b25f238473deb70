//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API server.

use chrono::{DateTime, Utc};
use promptsmith_core::{
    FollowUpAnswer, GenerationOutcome, GenerationPhase, HistoryEntry, HistoryFilter, PlanTier,
    Preset, PresetId, Remaining,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Requests FROM the Client
//=========================================================================================

/// A request to turn a rough idea into a structured prompt.
#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateRequest {
    /// The user's free-form idea.
    pub input: String,
    /// Optional preset the input was started from (e.g. `coding`, `business-plan`).
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub preset_id: Option<PresetId>,
    /// An answer to one of the previous result's follow-up questions.
    #[serde(default)]
    pub follow_up: Option<FollowUpPayload>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct FollowUpPayload {
    pub question: String,
    pub answer: String,
}

impl From<FollowUpPayload> for FollowUpAnswer {
    fn from(payload: FollowUpPayload) -> Self {
        FollowUpAnswer {
            question: payload.question,
            answer: payload.answer,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SetPlanRequest {
    #[schema(value_type = String, example = "pro")]
    pub plan: PlanTier,
}

/// Query string for listing history.
#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct HistoryQuery {
    /// `all` (default) or `saved`.
    #[param(value_type = Option<String>)]
    pub tab: Option<HistoryFilter>,
    /// Case-insensitive search over input and prompt text.
    pub q: Option<String>,
}

//=========================================================================================
// Responses TO the Client
//=========================================================================================

/// Every failed request carries a single human-readable message.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// One history entry, with the same field names as the persisted record.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub preset_id: Option<String>,
    pub input_text: String,
    pub output_text: String,
    pub follow_ups: Vec<String>,
    pub saved: bool,
}

impl From<&HistoryEntry> for HistoryEntryView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id,
            created_at: entry.created_at,
            preset_id: entry.preset_id.map(|p| p.as_str().to_string()),
            input_text: entry.input_text.clone(),
            output_text: entry.output_text.clone(),
            follow_ups: entry.follow_ups.clone(),
            saved: entry.saved,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct GenerateResponse {
    /// The copy-ready prompt.
    pub prompt: String,
    pub follow_up_questions: Vec<String>,
    pub entry: HistoryEntryView,
    /// Generations left today; `null` when unlimited.
    pub remaining: Option<u32>,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            entry: HistoryEntryView::from(&outcome.entry),
            prompt: outcome.result.prompt_text,
            follow_up_questions: outcome.result.follow_up_questions,
            remaining: outcome.remaining.as_option(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct UsageResponse {
    #[schema(value_type = String)]
    pub plan: PlanTier,
    pub used_today: u32,
    /// `null` when the plan has no daily cap.
    pub daily_limit: Option<u32>,
    /// `null` when unlimited.
    pub remaining: Option<u32>,
}

impl UsageResponse {
    pub fn new(plan: PlanTier, used_today: u32, daily_limit: u32, remaining: Remaining) -> Self {
        Self {
            plan,
            used_today,
            daily_limit: (plan == PlanTier::Free).then_some(daily_limit),
            remaining: remaining.as_option(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SessionResponse {
    #[schema(value_type = String)]
    pub plan: PlanTier,
    /// `idle` unless a generation is in flight.
    #[schema(value_type = String)]
    pub phase: GenerationPhase,
    pub busy: bool,
    pub usage: UsageResponse,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct PresetView {
    pub id: String,
    pub label: String,
    pub description: String,
    pub template: String,
    pub pro_only: bool,
    /// True when the current plan cannot use this preset.
    pub locked: bool,
}

impl PresetView {
    pub fn new(preset: &Preset, plan: PlanTier) -> Self {
        Self {
            id: preset.id.as_str().to_string(),
            label: preset.label.to_string(),
            description: preset.description.to_string(),
            template: preset.template.to_string(),
            pro_only: preset.pro_only,
            locked: !preset.is_available(plan),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ToggleSavedResponse {
    pub id: Uuid,
    pub saved: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ClearUnsavedResponse {
    pub removed: usize,
}
