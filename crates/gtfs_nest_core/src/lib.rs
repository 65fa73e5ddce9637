pub mod csv_reader;
pub mod engine;
pub mod feed;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod progress;

pub use csv_reader::{read_csv_from_reader, CsvParseError, CsvTable};
pub use engine::{nest_input, nest_input_with, unique_service_ids, NestError, NestOutcome};
pub use feed::GtfsFeed;
pub use gtfs_nest_model;
pub use input::{GtfsInput, GtfsInputError, GtfsInputReader, GtfsInputSource};
pub use output::{render_documents, write_documents, CheckpointWriter, OutputError, OutputFormat};
pub use pipeline::{default_pipeline, PipelineRunner, Stage};
pub use progress::ProgressHandler;
