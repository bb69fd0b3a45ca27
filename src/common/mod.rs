pub mod logging;
pub mod output;
pub mod progress;
pub mod records;
pub mod stats;
pub mod utils;

pub use logging::*;
pub use output::{expanded_path, next_hop_path};
pub use progress::create_count_progress_bar;
pub use records::*;
pub use stats::StageStats;
pub use utils::*;
