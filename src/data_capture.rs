pub mod recorder;
pub mod relay;
pub mod types;

pub use recorder::SessionRecorder;
pub use relay::CaptureRelay;
pub use types::{CloseReason, Direction, RelayState};
