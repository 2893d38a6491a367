#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod factory;
pub mod model;
pub mod results;
pub mod scheduler;
pub mod time;

pub use engine::{IgnoredReason, Progress, SessionEngine, SessionStartError, Transition};
pub use error::Error;
pub use factory::{FactoryError, QuestionFactory};
pub use scheduler::{AppliedReview, ReviewCountdown, SubmissionReport};
pub use time::Clock;
