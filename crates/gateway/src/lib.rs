#![forbid(unsafe_code)]

pub mod http;
pub mod identity;
pub mod repository;

pub use http::{ApiConfig, HttpGateway};
pub use identity::{StaticIdentity, StoredIdentity, StoredSession};
pub use repository::{
    Gateway, GatewayError, InMemoryGateway, QuizSource, SessionIdentity, SubmissionSink,
};
