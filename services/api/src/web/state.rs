//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use promptsmith_core::{
    GenerationError, GenerationOutcome, GenerationRequest, PlanTier, SessionContext,
    SessionController,
};
use std::sync::Arc;
use tokio::sync::RwLock;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: Arc<SessionController>,
    /// The plan selection for this process. Not persisted; resets on restart.
    /// A generation holds a read guard for its whole run, so a plan switch
    /// lands either before it starts or after it commits.
    pub session: RwLock<SessionContext>,
}

impl AppState {
    /// `controller` must have been built with the same starting plan as `config.default_plan`.
    pub fn new(config: Arc<Config>, controller: Arc<SessionController>) -> Self {
        let session = RwLock::new(SessionContext::new(config.default_plan));
        Self {
            config,
            controller,
            session,
        }
    }

    /// A snapshot of the session context, taken once per request.
    pub async fn context(&self) -> SessionContext {
        *self.session.read().await
    }

    /// Runs one generation under the current plan.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let session = self.session.read().await;
        self.controller.generate(&session, request).await
    }

    /// Switches plans and re-applies history retention under the new plan.
    /// Waits for an in-flight generation to commit first.
    pub async fn set_plan(&self, plan: PlanTier) -> SessionContext {
        let mut session = self.session.write().await;
        session.plan = plan;
        self.controller.plan_changed(&session).await;
        *session
    }
}
