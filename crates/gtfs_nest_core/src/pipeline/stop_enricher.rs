use gtfs_nest_model::{RouteDocument, Stop, StopDetails};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::pipeline::Stage;
use crate::GtfsFeed;

/// Copies code, name and position from stops.txt onto every stop visit.
#[derive(Debug, Default)]
pub struct StopEnricher;

impl Stage for StopEnricher {
    fn name(&self) -> &'static str {
        "stop_enricher"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        // Later rows win on duplicate stop_id.
        let stops_by_id: FxHashMap<&str, &Stop> = feed
            .stops
            .rows
            .iter()
            .map(|stop| (stop.stop_id.as_str(), stop))
            .collect();

        let mut unmatched = 0usize;
        let visits = routes
            .iter_mut()
            .flat_map(|route| route.trips.values_mut())
            .flat_map(|trip| trip.stops.iter_mut());
        for visit in visits {
            match stops_by_id.get(visit.stop_id.as_str()) {
                Some(stop) => visit.details = Some(StopDetails::from(*stop)),
                None => unmatched += 1,
            }
        }

        if unmatched > 0 {
            debug!("{} stop visits reference an unknown stop_id", unmatched);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{route, stop_time, trip};
    use crate::pipeline::{RouteAssembler, StopTimeJoiner, TripJoiner};
    use crate::CsvTable;
    use gtfs_nest_model::FeedId;

    fn stop(stop_id: &str, name: &str) -> Stop {
        Stop {
            stop_id: FeedId::from(stop_id),
            stop_name: Some(name.to_string()),
            stop_lat: Some(45.5),
            stop_lon: Some(-73.6),
            ..Default::default()
        }
    }

    #[test]
    fn enriches_known_stops_and_leaves_unknown_untouched() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id"],
            vec![trip("R1", "T1", "S1", None)],
        );
        feed.stop_times = CsvTable::from_rows(
            &["trip_id", "stop_id"],
            vec![
                stop_time("T1", "A", 1, "08:00:00"),
                stop_time("T1", "GHOST", 2, "08:05:00"),
            ],
        );
        feed.stops = CsvTable::from_rows(
            &["stop_id", "stop_name"],
            vec![stop("A", "Old Alpha"), stop("A", "Alpha")],
        );

        let mut routes = Vec::new();
        RouteAssembler.apply(&feed, &mut routes);
        TripJoiner.apply(&feed, &mut routes);
        StopTimeJoiner.apply(&feed, &mut routes);
        StopEnricher.apply(&feed, &mut routes);

        let stops = &routes[0].trips["T1"].stops;
        let details = stops[0].details.as_ref().unwrap();
        assert_eq!(details.stop_name.as_deref(), Some("Alpha"));
        assert_eq!(details.stop_lat, Some(45.5));
        assert!(stops[1].details.is_none());
    }
}
