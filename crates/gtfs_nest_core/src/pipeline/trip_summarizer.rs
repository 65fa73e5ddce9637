use gtfs_nest_model::{RouteDocument, TripSummary};

use crate::pipeline::Stage;
use crate::GtfsFeed;

/// Derives first departure and last arrival from the positional ends of `stops`.
#[derive(Debug, Default)]
pub struct TripSummarizer;

impl Stage for TripSummarizer {
    fn name(&self) -> &'static str {
        "trip_summarizer"
    }

    fn apply(&self, _feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        for trip in routes.iter_mut().flat_map(|route| route.trips.values_mut()) {
            trip.summary = TripSummary::from_visits(&trip.stops);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{route, stop_time, trip};
    use crate::pipeline::{RouteAssembler, StopTimeJoiner, TripJoiner};
    use crate::CsvTable;

    #[test]
    fn summarizes_by_position_not_sequence() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id"],
            vec![trip("R1", "T1", "S1", None), trip("R1", "T2", "S1", None)],
        );
        feed.stop_times = CsvTable::from_rows(
            &["trip_id", "stop_id"],
            vec![
                stop_time("T1", "B", 5, "08:30:00"),
                stop_time("T1", "A", 1, "08:00:00"),
            ],
        );

        let mut routes = Vec::new();
        RouteAssembler.apply(&feed, &mut routes);
        TripJoiner.apply(&feed, &mut routes);
        StopTimeJoiner.apply(&feed, &mut routes);
        TripSummarizer.apply(&feed, &mut routes);

        let summary = &routes[0].trips["T1"].summary;
        assert_eq!(summary.first_stop_id.as_ref().unwrap().as_str(), "B");
        assert_eq!(summary.first_departure_time.unwrap().to_string(), "08:30:00");
        assert_eq!(summary.last_stop_id.as_ref().unwrap().as_str(), "A");

        let empty = serde_json::to_value(&routes[0].trips["T2"].summary).unwrap();
        assert_eq!(empty["first_stop_id"], 0);
        assert_eq!(empty["last_arrival_time"], "");
    }
}
