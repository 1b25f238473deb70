//! crates/promptsmith_core/src/session.rs
//!
//! The Session Controller: runs one generation attempt through
//! validation, quota check, the remote call, normalization, and the commit of
//! usage and history.
//!
//! Only one attempt runs at a time. A request that arrives while another is in
//! flight is rejected with [`GenerationError::Busy`], never queued.

use crate::domain::{
    GenerationOutcome, GenerationPhase, GenerationRequest, HistoryEntry, PlanLimits, Remaining,
    SessionContext,
};
use crate::history::HistoryStore;
use crate::normalizer::normalize;
use crate::ports::{Clock, GenerationFailure, KeyValueStore, PromptGenerationService};
use crate::presets;
use crate::usage::UsageMeter;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

//=========================================================================================
// User-Facing Errors
//=========================================================================================

/// Why a generation attempt ended without a result. `Display` is the message
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Please describe your idea before generating a prompt.")]
    EmptyInput,

    #[error("The {preset} preset is part of the Pro plan. Upgrade to unlock it.")]
    PresetLocked { preset: &'static str },

    #[error("You've used all {limit} free generations for today. Upgrade to Pro for unlimited prompts.")]
    QuotaExceeded { limit: u32 },

    #[error("A prompt is already being generated. Please wait for it to finish.")]
    Busy,

    #[error("{}", rejection_message(*status, message.as_deref()))]
    Rejected { status: u16, message: Option<String> },

    #[error("Something went wrong while generating your prompt. Please try again.")]
    Failed,
}

fn rejection_message(status: u16, message: Option<&str>) -> String {
    match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => format!("Request failed ({})", status),
    }
}

impl From<GenerationFailure> for GenerationError {
    fn from(failure: GenerationFailure) -> Self {
        match failure {
            GenerationFailure::Rejected { status, message } => {
                GenerationError::Rejected { status, message }
            }
            GenerationFailure::Transport(_) => GenerationError::Failed,
        }
    }
}

//=========================================================================================
// Phase Tracking
//=========================================================================================

/// Holds the busy slot for one attempt and returns the controller to `Idle` on drop,
/// whichever gate the attempt stops at.
struct PhaseGuard<'a> {
    phase: &'a watch::Sender<GenerationPhase>,
}

impl<'a> PhaseGuard<'a> {
    fn acquire(phase: &'a watch::Sender<GenerationPhase>) -> Option<Self> {
        let acquired = phase.send_if_modified(|current| {
            if *current == GenerationPhase::Idle {
                *current = GenerationPhase::Validating;
                true
            } else {
                false
            }
        });
        acquired.then_some(Self { phase })
    }

    fn enter(&self, next: GenerationPhase) {
        self.phase.send_replace(next);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(GenerationPhase::Idle);
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct SessionController {
    generator: Arc<dyn PromptGenerationService>,
    clock: Arc<dyn Clock>,
    usage: Mutex<UsageMeter>,
    history: Mutex<HistoryStore>,
    phase: watch::Sender<GenerationPhase>,
}

impl SessionController {
    /// Loads usage and history from `store` and wires in the collaborator.
    /// History is trimmed to the retention cap of the session's starting plan.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        generator: Arc<dyn PromptGenerationService>,
        clock: Arc<dyn Clock>,
        limits: PlanLimits,
        initial: &SessionContext,
    ) -> Self {
        let usage = UsageMeter::load(store.clone(), clock.clone(), limits.daily_limit);
        let mut history = HistoryStore::load(store, limits.history_limit);
        let evicted = history.enforce_retention(initial.plan);
        if evicted > 0 {
            info!(
                "Dropped {} stored history entries over the {} plan's cap.",
                evicted,
                initial.plan.as_str()
            );
        }
        let (phase, _) = watch::channel(GenerationPhase::Idle);
        info!(
            "Session loaded: {} history entries, {} generations used today.",
            history.len(),
            usage.used_today()
        );

        Self {
            generator,
            clock,
            usage: Mutex::new(usage),
            history: Mutex::new(history),
            phase,
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        *self.phase.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != GenerationPhase::Idle
    }

    /// A receiver the presentation layer can watch to disable its controls.
    pub fn subscribe_phase(&self) -> watch::Receiver<GenerationPhase> {
        self.phase.subscribe()
    }

    pub fn usage(&self) -> &Mutex<UsageMeter> {
        &self.usage
    }

    pub fn history(&self) -> &Mutex<HistoryStore> {
        &self.history
    }

    pub async fn remaining(&self, ctx: &SessionContext) -> Remaining {
        self.usage.lock().await.remaining(ctx.plan)
    }

    /// Re-applies history retention after the session's plan changed.
    pub async fn plan_changed(&self, ctx: &SessionContext) {
        info!("Plan is now {}", ctx.plan.as_str());
        self.history.lock().await.enforce_retention(ctx.plan);
    }

    /// Runs one generation attempt.
    pub async fn generate(
        &self,
        ctx: &SessionContext,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let guard = PhaseGuard::acquire(&self.phase).ok_or_else(|| {
            warn!("Generation rejected: another request is in flight.");
            GenerationError::Busy
        })?;

        // --- Validating ---
        if request.input.trim().is_empty() {
            return Err(GenerationError::EmptyInput);
        }
        if let Some(preset) = request.preset_id.and_then(presets::find) {
            if !preset.is_available(ctx.plan) {
                return Err(GenerationError::PresetLocked {
                    preset: preset.label,
                });
            }
        }

        // --- QuotaCheck ---
        guard.enter(GenerationPhase::QuotaCheck);
        {
            let usage = self.usage.lock().await;
            if usage.remaining(ctx.plan).is_exhausted() {
                info!("Daily quota reached for the {} plan.", ctx.plan.as_str());
                return Err(GenerationError::QuotaExceeded {
                    limit: usage.daily_limit(),
                });
            }
        }

        // --- Requesting ---
        guard.enter(GenerationPhase::Requesting);
        let input = request.composed_input();
        let raw = self.generator.generate(&input).await.map_err(|failure| {
            warn!("Generation collaborator failed: {}", failure);
            GenerationError::from(failure)
        })?;

        // --- Normalizing ---
        guard.enter(GenerationPhase::Normalizing);
        let result = normalize(&raw);

        // --- Committing ---
        guard.enter(GenerationPhase::Committing);
        let entry = HistoryEntry::new(self.clock.now(), request.preset_id, input, &result);
        let remaining = {
            let mut usage = self.usage.lock().await;
            let mut history = self.history.lock().await;
            usage.record_usage(ctx.plan);
            history.append(entry.clone(), ctx.plan);
            usage.remaining(ctx.plan)
        };

        info!(
            "Generated prompt {} ({} follow-up questions).",
            entry.id,
            result.follow_up_questions.len()
        );
        drop(guard);

        Ok(GenerationOutcome {
            entry,
            result,
            remaining,
        })
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{FollowUpAnswer, HistoryFilter, PlanTier, PresetId};
    use crate::store::{MemoryStore, HISTORY_KEY, USAGE_KEY};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Replays canned responses and records every input it was sent.
    #[derive(Default)]
    struct ScriptedGenerator {
        responses: StdMutex<VecDeque<Result<Value, GenerationFailure>>>,
        inputs: StdMutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn replying(responses: Vec<Result<Value, GenerationFailure>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                inputs: StdMutex::new(Vec::new()),
            })
        }

        fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PromptGenerationService for ScriptedGenerator {
        async fn generate(&self, input: &str) -> Result<Value, GenerationFailure> {
            self.inputs.lock().unwrap().push(input.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({ "prompt": "default" })))
        }
    }

    /// Blocks until released, to hold the controller in `Requesting`.
    struct GatedGenerator {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl PromptGenerationService for GatedGenerator {
        async fn generate(&self, _input: &str) -> Result<Value, GenerationFailure> {
            self.gate.notified().await;
            Ok(json!({ "prompt": "released" }))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn controller(
        store: Arc<MemoryStore>,
        generator: Arc<dyn PromptGenerationService>,
    ) -> SessionController {
        SessionController::new(
            store,
            generator,
            Arc::new(FixedClock::at_day(today())),
            PlanLimits::default(),
            &free(),
        )
    }

    fn free() -> SessionContext {
        SessionContext::new(PlanTier::Free)
    }

    #[tokio::test]
    async fn successful_generation_commits_usage_and_history() {
        let store = Arc::new(MemoryStore::new());
        let generator = ScriptedGenerator::replying(vec![Ok(json!({
            "prompt": "Role: X\nTask: Y",
            "follow_up_questions": ["Q1?", "Q2?"]
        }))]);
        let controller = controller(store.clone(), generator.clone());

        let outcome = controller
            .generate(&free(), GenerationRequest::new("  build me a plan  "))
            .await
            .unwrap();

        assert_eq!(outcome.result.prompt_text, "Role: X\nTask: Y");
        assert_eq!(outcome.result.follow_up_questions, vec!["Q1?", "Q2?"]);
        assert_eq!(outcome.remaining, Remaining::Limited(4));
        assert!(!outcome.entry.saved);
        assert_eq!(outcome.entry.input_text, "build me a plan");
        assert_eq!(generator.inputs(), vec!["build me a plan"]);

        assert_eq!(controller.usage().lock().await.used_today(), 1);
        let history = controller.history().lock().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].id, outcome.entry.id);
        assert!(store.get(USAGE_KEY).unwrap().is_some());
        assert!(store.get(HISTORY_KEY).unwrap().is_some());
        assert_eq!(controller.phase(), GenerationPhase::Idle);
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_any_effect() {
        let store = Arc::new(MemoryStore::new());
        let generator = ScriptedGenerator::replying(vec![]);
        let controller = controller(store.clone(), generator.clone());

        for input in ["", "   ", "\n\t"] {
            let err = controller
                .generate(&free(), GenerationRequest::new(input))
                .await
                .unwrap_err();
            assert_eq!(err, GenerationError::EmptyInput);
        }
        assert!(generator.inputs().is_empty());
        assert!(store.get(USAGE_KEY).unwrap().is_none());
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn exhausted_quota_blocks_free_plan_with_the_cap_in_the_message() {
        let store = Arc::new(
            MemoryStore::new().with_value(USAGE_KEY, r#"{"date": "2024-05-01", "count": 5}"#),
        );
        let generator = ScriptedGenerator::replying(vec![]);
        let controller = controller(store, generator.clone());

        let err = controller
            .generate(&free(), GenerationRequest::new("idea"))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::QuotaExceeded { limit: 5 });
        assert!(err.to_string().contains('5'));
        assert!(generator.inputs().is_empty());
    }

    #[tokio::test]
    async fn pro_plan_ignores_quota_and_does_not_meter() {
        let store = Arc::new(
            MemoryStore::new().with_value(USAGE_KEY, r#"{"date": "2024-05-01", "count": 5}"#),
        );
        let controller = controller(store, ScriptedGenerator::replying(vec![]));
        let pro = SessionContext::new(PlanTier::Pro);

        let outcome = controller
            .generate(&pro, GenerationRequest::new("idea"))
            .await
            .unwrap();
        assert_eq!(outcome.remaining, Remaining::Unlimited);
        assert_eq!(controller.usage().lock().await.used_today(), 5);
    }

    #[tokio::test]
    async fn rejection_passes_the_collaborator_message_through() {
        let store = Arc::new(MemoryStore::new());
        let generator = ScriptedGenerator::replying(vec![Err(GenerationFailure::Rejected {
            status: 429,
            message: Some("quota exceeded".to_string()),
        })]);
        let controller = controller(store.clone(), generator);

        let err = controller
            .generate(&free(), GenerationRequest::new("idea"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(controller.usage().lock().await.used_today(), 0);
        assert!(controller.history().lock().await.is_empty());
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn rejection_without_message_reports_the_status() {
        let generator = ScriptedGenerator::replying(vec![Err(GenerationFailure::Rejected {
            status: 503,
            message: None,
        })]);
        let controller = controller(Arc::new(MemoryStore::new()), generator);

        let err = controller
            .generate(&free(), GenerationRequest::new("idea"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed (503)");
    }

    #[tokio::test]
    async fn transport_failure_is_generic_and_leaves_state_untouched() {
        let generator = ScriptedGenerator::replying(vec![Err(GenerationFailure::Transport(
            "connection reset".to_string(),
        ))]);
        let controller = controller(Arc::new(MemoryStore::new()), generator);

        let err = controller
            .generate(&free(), GenerationRequest::new("idea"))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Failed);
        assert!(!err.to_string().contains("connection reset"));
        assert_eq!(controller.usage().lock().await.used_today(), 0);
        assert_eq!(controller.phase(), GenerationPhase::Idle);
    }

    #[tokio::test]
    async fn locked_preset_is_rejected_on_free_plan() {
        let generator = ScriptedGenerator::replying(vec![]);
        let controller = controller(Arc::new(MemoryStore::new()), generator.clone());
        let request = GenerationRequest {
            input: "a plan".to_string(),
            preset_id: Some(PresetId::BusinessPlan),
            follow_up: None,
        };

        let err = controller.generate(&free(), request.clone()).await.unwrap_err();
        assert!(matches!(err, GenerationError::PresetLocked { .. }));
        assert!(generator.inputs().is_empty());

        let pro = SessionContext::new(PlanTier::Pro);
        let outcome = controller.generate(&pro, request).await.unwrap();
        assert_eq!(outcome.entry.preset_id, Some(PresetId::BusinessPlan));
    }

    #[tokio::test]
    async fn follow_up_answer_is_sent_and_stored() {
        let generator = ScriptedGenerator::replying(vec![]);
        let controller = controller(Arc::new(MemoryStore::new()), generator.clone());
        let request = GenerationRequest {
            input: "plan a trip".to_string(),
            preset_id: None,
            follow_up: Some(FollowUpAnswer {
                question: "Where to?".to_string(),
                answer: "Lisbon".to_string(),
            }),
        };

        let outcome = controller.generate(&free(), request).await.unwrap();
        assert_eq!(generator.inputs(), vec!["plan a trip\n\nQ: Where to?\nA: Lisbon"]);
        assert_eq!(outcome.entry.input_text, "plan a trip\n\nQ: Where to?\nA: Lisbon");
    }

    #[tokio::test]
    async fn concurrent_request_is_rejected_while_one_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(controller(
            Arc::new(MemoryStore::new()),
            Arc::new(GatedGenerator { gate: gate.clone() }),
        ));
        let mut phases = controller.subscribe_phase();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .generate(&SessionContext::new(PlanTier::Free), GenerationRequest::new("first"))
                    .await
            })
        };
        phases
            .wait_for(|p| *p == GenerationPhase::Requesting)
            .await
            .unwrap();
        assert!(controller.is_busy());

        let second = controller
            .generate(&free(), GenerationRequest::new("second"))
            .await;
        assert_eq!(second.unwrap_err(), GenerationError::Busy);

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.result.prompt_text, "released");
        assert_eq!(controller.phase(), GenerationPhase::Idle);
        assert_eq!(controller.history().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn retention_holds_across_many_generations() {
        let controller = controller(Arc::new(MemoryStore::new()), ScriptedGenerator::replying(vec![]));
        let pro = SessionContext::new(PlanTier::Pro);
        for i in 0..15 {
            controller
                .generate(&pro, GenerationRequest::new(format!("idea {}", i)))
                .await
                .unwrap();
        }
        assert_eq!(controller.history().lock().await.len(), 15);

        controller.plan_changed(&free()).await;
        let history = controller.history().lock().await;
        assert_eq!(history.list(HistoryFilter::All, None).len(), 10);
    }

    fn stored_history(count: i64) -> String {
        let base = FixedClock::at_day(today()).now();
        let entries: Vec<HistoryEntry> = (0..count)
            .map(|i| {
                HistoryEntry::new(
                    base + chrono::Duration::minutes(i),
                    None,
                    format!("idea {}", i),
                    &crate::domain::NormalizedResult {
                        prompt_text: format!("Task: idea {}", i),
                        follow_up_questions: vec![],
                    },
                )
            })
            .collect();
        serde_json::to_string(&entries).unwrap()
    }

    #[tokio::test]
    async fn stored_history_over_the_cap_is_trimmed_on_a_free_start() {
        let store = Arc::new(MemoryStore::new().with_value(HISTORY_KEY, &stored_history(15)));
        let controller = controller(store.clone(), ScriptedGenerator::replying(vec![]));

        let history = controller.history().lock().await;
        let listed = history.list(HistoryFilter::All, None);
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].input_text, "idea 14");
        assert_eq!(listed[9].input_text, "idea 5");

        let persisted: Vec<Value> =
            serde_json::from_str(&store.get(HISTORY_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 10);
    }

    #[tokio::test]
    async fn stored_history_is_kept_whole_on_a_pro_start() {
        let store = Arc::new(MemoryStore::new().with_value(HISTORY_KEY, &stored_history(15)));
        let controller = SessionController::new(
            store,
            ScriptedGenerator::replying(vec![]),
            Arc::new(FixedClock::at_day(today())),
            PlanLimits::default(),
            &SessionContext::new(PlanTier::Pro),
        );
        assert_eq!(controller.history().lock().await.len(), 15);
    }
}
