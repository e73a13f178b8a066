//! Application service layer.
//!
//! The HTTP/REST surface, authentication and account management live
//! outside this repository; they call into these services and pass the
//! resolved caller as an [`vflix_models::IdentityContext`] value. The
//! services own the explicit orchestration the call sites need: creating a
//! video enqueues its processing job, deleting one enqueues the asset
//! sweep.

pub mod error;
pub mod videos;
pub mod watch;

pub use error::{ApiError, ApiResult};
pub use videos::{PlaybackUrls, VideoService};
pub use watch::WatchProgressService;
