//! Core library functions for musichub

pub mod crons;
pub mod driver;
pub mod normalize;
pub mod queue;
pub mod ratelimit;
pub mod resolver;
pub mod search;
pub mod session;
pub mod sink;

pub use driver::{HistoryRecorder, PlaybackDriver, PlaybackNotice};
pub use queue::{IgnoreReason, Outcome, PreferencesStore, QueueStore};
pub use ratelimit::{RateLimiter, Route};
pub use resolver::{PlaybackResolver, Resolve};
pub use search::{SearchRequest, SearchResponse, SearchService};
pub use session::{SessionRegistry, SessionSnapshot};
pub use sink::{HeadlessSink, MediaSink};
