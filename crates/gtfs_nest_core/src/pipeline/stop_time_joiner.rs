use gtfs_nest_model::{FeedId, RouteDocument, StopVisit};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::pipeline::Stage;
use crate::GtfsFeed;

/// Appends stop_times.txt rows to their trip in file order.
///
/// No sorting by `stop_sequence` happens here; the order of the source file is kept.
#[derive(Debug, Default)]
pub struct StopTimeJoiner;

impl Stage for StopTimeJoiner {
    fn name(&self) -> &'static str {
        "stop_time_joiner"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        let mut routes_by_trip: FxHashMap<FeedId, Vec<usize>> = FxHashMap::default();
        for (index, route) in routes.iter_mut().enumerate() {
            for (trip_id, trip) in route.trips.iter_mut() {
                trip.stops.clear();
                trip.days.clear();
                routes_by_trip.entry(trip_id.clone()).or_default().push(index);
            }
        }

        let mut orphans = 0usize;
        for row in &feed.stop_times.rows {
            let Some(indices) = routes_by_trip.get(row.trip_id.as_str()) else {
                orphans += 1;
                continue;
            };
            let visit = StopVisit::from(row);
            for &index in indices {
                if let Some(trip) = routes[index].trips.get_mut(row.trip_id.as_str()) {
                    trip.stops.push(visit.clone());
                }
            }
        }

        if orphans > 0 {
            debug!("dropped {} stop times with an unknown trip_id", orphans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{route, stop_time, trip};
    use crate::pipeline::{RouteAssembler, TripJoiner};
    use crate::CsvTable;

    #[test]
    fn keeps_file_order_and_drops_orphans() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id"],
            vec![trip("R1", "T1", "S1", None), trip("R1", "T2", "S1", None)],
        );
        feed.stop_times = CsvTable::from_rows(
            &["trip_id", "stop_id", "stop_sequence"],
            vec![
                stop_time("T1", "B", 2, "08:10:00"),
                stop_time("TX", "Z", 1, "09:00:00"),
                stop_time("T1", "A", 1, "08:00:00"),
            ],
        );

        let mut routes = Vec::new();
        RouteAssembler.apply(&feed, &mut routes);
        TripJoiner.apply(&feed, &mut routes);
        StopTimeJoiner.apply(&feed, &mut routes);

        let stops: Vec<&str> = routes[0].trips["T1"]
            .stops
            .iter()
            .map(|visit| visit.stop_id.as_str())
            .collect();
        assert_eq!(stops, vec!["B", "A"]);
        assert!(routes[0].trips["T2"].stops.is_empty());
        assert!(routes[0].trips["T1"].stops[0].details.is_none());
    }
}
