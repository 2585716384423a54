pub mod auth;
pub mod failures;
pub mod logging;
pub mod rate_limit;

pub use auth::require_bearer;
pub use failures::{normalize_failures, FailureSlot};
pub use logging::logging_middleware;
pub use rate_limit::{rate_limit, RateLimiter};
