//! Per-guild playback sessions.

pub mod events;
pub mod queue;
pub mod session;
pub mod registry;

pub use events::PlaybackEventRouter;
pub use queue::{Queue, QueueMode};
pub use session::{Session, SessionState};
pub use registry::{EnqueueOutcome, LoopToggle, NowPlaying, SessionRegistry};
