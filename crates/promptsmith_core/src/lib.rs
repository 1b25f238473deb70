pub mod clock;
pub mod domain;
pub mod export;
pub mod history;
pub mod normalizer;
pub mod ports;
pub mod presets;
pub mod session;
pub mod store;
pub mod usage;

pub use clock::{FixedClock, SystemClock};
pub use domain::{
    FollowUpAnswer, GenerationOutcome, GenerationPhase, GenerationRequest, HistoryEntry,
    HistoryFilter, NormalizedResult, PlanLimits, PlanTier, Preset, PresetId, Remaining,
    SessionContext, UsageRecord,
};
pub use history::HistoryStore;
pub use normalizer::{normalize, RemotePayload};
pub use ports::{
    Clock, GenerationFailure, KeyValueStore, PortError, PortResult, PromptGenerationService,
};
pub use session::{GenerationError, SessionController};
pub use store::MemoryStore;
pub use usage::UsageMeter;
