/// Trait for handling progress events while loading tables and running stages
pub trait ProgressHandler: Send + Sync {
    /// Called when starting to load a file
    fn on_start_file_load(&self, file: &str);

    /// Called when a file finished loading, with its row count
    fn on_finish_file_load(&self, file: &str, rows: usize);

    /// Set total number of files to load (optional usage)
    fn set_total_files(&self, count: usize) {
        let _ = count;
    }

    /// Set total number of pipeline stages to run
    fn set_total_stages(&self, count: usize);

    /// Called when a stage starts
    fn on_start_stage(&self, stage: &str);

    /// Called when a stage has been applied to the document
    fn on_finish_stage(&self, stage: &str);
}
