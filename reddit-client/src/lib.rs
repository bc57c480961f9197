pub mod api;
pub mod auth;
pub mod collector;
pub mod metrics;


pub use api::{Comment, RedditApiClient, Submission};
pub use auth::{AppOnlyAuthenticator, RedditToken};
pub use collector::{RedditCollector, SearchApi, COMMENTS_PER_SUBMISSION};
pub use metrics::{ApiMetrics, MetricsCollector};
