//! Ascent Orchestrator
//!
//! Request-scoped use cases over the Ascent engine, the repository and
//! collaborator boundary contracts, the HTTP API, and WebSocket event
//! streaming.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evidence;
pub mod repo;
pub mod session;
pub mod websocket;

pub use api::{
    create_router, AppState, CodeRequest, CreateAttemptRequest, ErrorResponse, HintRequest,
    ReflectionRequest, StatusResponse, ThinkingRequest,
};
pub use catalog::{Catalog, Problem, TestCase};
pub use config::Config;
pub use error::{CoachError, Result};
pub use evidence::{
    CodeExecutor, EvidenceProvider, ExecutionOutcome, NullEvidenceProvider, ScriptedExecutor,
    StaticEvidenceProvider, StubExecutor,
};
pub use repo::{AttemptRepo, InMemoryAttemptRepo, InMemorySkillRepo, SkillRepo};
pub use session::{
    CoachService, HintGrant, SkillEntry, SubmissionReview, ThinkingReview, UserProgress,
};
pub use websocket::{EventBroadcaster, SessionEvent};
