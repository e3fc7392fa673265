pub mod clock;
pub mod error;
pub mod output_macros;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, SnapError};
