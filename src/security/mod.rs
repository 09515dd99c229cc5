//! Request admission: token-bucket rate limiting.

pub mod rate_limit;

pub use rate_limit::{RateLimiter, rate_limit_middleware};
