mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{Phase, SessionProgress};
pub use service::{Advance, QuizSession};
pub use workflow::{QuizLoopService, SessionStepResult};
