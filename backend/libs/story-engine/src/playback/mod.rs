/// Story playback
///
/// - `machine`: synchronous Closed/Playing/Paused state machine
/// - `timer`: cancellable 100-step progress timer
/// - `session`: single-task session owning machine, grouping and timer
/// - `state`: playback state and render snapshots
pub mod machine;
pub mod session;
pub mod state;
pub mod timer;

pub use machine::{DisplayTarget, PlaybackMachine, Step};
pub use session::{PlaybackSession, SessionHandle};
pub use state::{PlaybackPhase, PlaybackSnapshot, PlaybackState};
pub use timer::ProgressTimer;
