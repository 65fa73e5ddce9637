use std::time::Instant;

use gtfs_nest_model::{FeedId, RouteDocument};
use rustc_hash::FxHashSet;
use tracing::info;

use crate::output::{CheckpointWriter, OutputError};
use crate::progress::ProgressHandler;
use crate::{GtfsFeed, GtfsInput, GtfsInputError, PipelineRunner};

#[derive(Debug, thiserror::Error)]
pub enum NestError {
    #[error(transparent)]
    Input(#[from] GtfsInputError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

pub struct NestOutcome {
    pub feed: GtfsFeed,
    pub routes: Vec<RouteDocument>,
}

/// Loads every table, then runs the pipeline. Nothing is returned on a fatal load error.
pub fn nest_input(input: &GtfsInput, runner: &PipelineRunner) -> Result<NestOutcome, NestError> {
    nest_input_with(input, runner, None, None)
}

pub fn nest_input_with(
    input: &GtfsInput,
    runner: &PipelineRunner,
    progress: Option<&dyn ProgressHandler>,
    checkpoints: Option<&CheckpointWriter>,
) -> Result<NestOutcome, NestError> {
    let started_at = Instant::now();
    let feed = GtfsFeed::from_input_with_progress(input, progress)?;
    info!("loaded feed from {} in {:?}", input.path().display(), started_at.elapsed());

    let routes = runner.run_with(&feed, progress, checkpoints)?;
    info!("nested {} routes in {:?}", routes.len(), started_at.elapsed());
    Ok(NestOutcome { feed, routes })
}

/// Distinct `service_id`s of trips.txt, in first-appearance order.
pub fn unique_service_ids(feed: &GtfsFeed) -> Vec<&FeedId> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    feed.trips
        .rows
        .iter()
        .map(|trip| &trip.service_id)
        .filter(|service_id| seen.insert(service_id.as_str()))
        .collect()
}
