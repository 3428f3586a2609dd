mod driver;
mod sink;

pub use driver::{Recorded, RecordedKind, Recording, RecordingDriver};
pub use sink::CapturingSink;
