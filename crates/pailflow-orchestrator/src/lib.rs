pub mod error;
pub mod orchestrator;
pub mod session;
pub mod worker;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{BotSessionOrchestrator, BotStatus};
pub use session::{ActiveSession, SessionRequest, SessionRuntime};
pub use worker::BotWorker;
