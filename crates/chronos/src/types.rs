use std::path::PathBuf;

use crate::batch::BatchPlan;

/// State shared by the file server's handlers.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Directory the batch export writes to
    pub output_dir: PathBuf,
    /// Plan used to group calendars on the index page
    pub plan: BatchPlan,
}
