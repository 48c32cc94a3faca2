pub mod cell;
pub mod config;
pub mod grid;
pub mod occupancy;
pub mod palette;
pub mod recorder;
pub mod search;
pub mod session_log;
pub mod simulator;

pub use cell::{Cell, Endpoint, SearchMark};
pub use grid::{ClickOutcome, GridMap, Pos};
pub use occupancy::Occupancy;
pub use palette::Rgb;
pub use recorder::{ExportError, FrameRecorder};
pub use search::{AstarEngine, Path, SearchEngine, SearchStep};
pub use simulator::{Outcome, Simulator, TickStatus};
