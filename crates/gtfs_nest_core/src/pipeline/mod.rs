use std::time::Instant;

use gtfs_nest_model::{FeedId, RouteDocument};
use rustc_hash::FxHashMap;
use tracing::info;

use crate::output::{CheckpointWriter, OutputError};
use crate::progress::ProgressHandler;
use crate::GtfsFeed;

pub mod route_assembler;
pub mod service_days;
pub mod shape_joiner;
pub mod stop_enricher;
pub mod stop_time_joiner;
pub mod trip_joiner;
pub mod trip_summarizer;

pub use route_assembler::RouteAssembler;
pub use service_days::ServiceDayResolver;
pub use shape_joiner::ShapeJoiner;
pub use stop_enricher::StopEnricher;
pub use stop_time_joiner::StopTimeJoiner;
pub use trip_joiner::TripJoiner;
pub use trip_summarizer::TripSummarizer;

/// One step of the join-and-nest pipeline.
///
/// A stage reads the immutable source tables and the document built so far,
/// and moves the document forward. Rows that reference nothing are dropped.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>);
}

#[derive(Default)]
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn register<S>(&mut self, stage: S)
    where
        S: Stage + 'static,
    {
        self.stages.push(Box::new(stage));
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self, feed: &GtfsFeed) -> Vec<RouteDocument> {
        let mut routes = Vec::new();
        for stage in &self.stages {
            self.apply_stage(stage.as_ref(), feed, &mut routes);
        }
        routes
    }

    pub fn run_with(
        &self,
        feed: &GtfsFeed,
        progress: Option<&dyn ProgressHandler>,
        checkpoints: Option<&CheckpointWriter>,
    ) -> Result<Vec<RouteDocument>, OutputError> {
        if let Some(progress) = progress {
            progress.set_total_stages(self.stages.len());
        }

        let mut routes = Vec::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if let Some(progress) = progress {
                progress.on_start_stage(stage.name());
            }
            self.apply_stage(stage.as_ref(), feed, &mut routes);
            if let Some(checkpoints) = checkpoints {
                checkpoints.write(index + 1, stage.name(), &routes)?;
            }
            if let Some(progress) = progress {
                progress.on_finish_stage(stage.name());
            }
        }
        Ok(routes)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    fn apply_stage(&self, stage: &dyn Stage, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        let started_at = Instant::now();
        stage.apply(feed, routes);
        info!("{} finished in {:?}", stage.name(), started_at.elapsed());
    }
}

/// Stages 2 to 8, in the only order in which they are meaningful.
pub fn default_pipeline() -> PipelineRunner {
    let mut runner = PipelineRunner::new();
    runner.register(RouteAssembler);
    runner.register(ShapeJoiner);
    runner.register(TripJoiner);
    runner.register(StopTimeJoiner);
    runner.register(ServiceDayResolver);
    runner.register(StopEnricher);
    runner.register(TripSummarizer);
    runner
}

/// Positions of each route id in the document. Duplicate ids map to several routes.
pub(crate) fn route_index(routes: &[RouteDocument]) -> FxHashMap<FeedId, Vec<usize>> {
    let mut index: FxHashMap<FeedId, Vec<usize>> = FxHashMap::default();
    for (position, route) in routes.iter().enumerate() {
        index.entry(route.route_id().clone()).or_default().push(position);
    }
    index
}
