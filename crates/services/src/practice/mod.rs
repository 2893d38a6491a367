mod session;
mod workflow;

// Public API of the practice subsystem.
pub use crate::error::PracticeError;
pub use session::PracticeSession;
pub use workflow::{DEFAULT_DUE_LIMIT, DEFAULT_SESSION_SIZE, PracticeLoopService};
