use log::info;
use std::time::Duration;

use super::format_elapsed;

/// Per-run counters shared by all four stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Rows read from the stage input
    pub input_rows: usize,
    /// Rows skipped because their key is in the checkpoint or repeats an earlier row
    pub already_done: usize,
    /// Rows attempted in this run
    pub attempted: usize,
    /// Rows whose page fetch or extraction failed (retried on the next run)
    pub failed: usize,
    /// Records appended to the checkpoint in this run
    pub written: usize,
}

impl StageStats {
    pub fn log_summary(&self, stage: &str, elapsed: Duration, output: &str) {
        info!("==================== {} SUMMARY ====================", stage.to_uppercase());
        info!("Total execution time: {}", format_elapsed(elapsed));
        info!("Input rows: {}", self.input_rows);
        info!("Already done or repeated: {}", self.already_done);
        info!("Attempted: {}", self.attempted);
        info!("Failed: {}", self.failed);
        info!("Records written: {}", self.written);
        info!("Output: {}", output);
        info!("========================================================");
    }
}
