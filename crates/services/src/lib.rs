#![forbid(unsafe_code)]

pub mod app_services;
pub mod assets;
pub mod error;
pub mod forum_service;
pub mod photo_service;
pub mod sessions;
pub mod test_service;

pub use cardak_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ForumServiceError, PhotoServiceError, SessionError, TestServiceError,
};
pub use forum_service::{DEFAULT_POST_LIMIT, ForumService};
pub use photo_service::PhotoService;
pub use sessions::{Advance, Phase, QuizLoopService, QuizSession, SessionProgress, SessionStepResult};
pub use test_service::TestService;
