#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod practice;
pub mod review_queue;
pub mod scheduling;

pub use vocab_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, PracticeError, SchedulingError};
pub use practice::{
    DEFAULT_DUE_LIMIT, DEFAULT_SESSION_SIZE, PracticeLoopService, PracticeSession,
};
pub use review_queue::{NextReview, ReviewQueueService};
pub use scheduling::{OfflineScheduling, Scheduling};
