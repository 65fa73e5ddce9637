use gtfs_nest_model::{RouteDocument, TripDocument};
use tracing::debug;

use crate::pipeline::{route_index, Stage};
use crate::GtfsFeed;

/// Nests each trips.txt row under its route, keyed by `trip_id`.
#[derive(Debug, Default)]
pub struct TripJoiner;

impl Stage for TripJoiner {
    fn name(&self) -> &'static str {
        "trip_joiner"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        let routes_by_id = route_index(routes);

        let mut orphans = 0usize;
        for trip in &feed.trips.rows {
            let Some(indices) = routes_by_id.get(trip.route_id.as_str()) else {
                orphans += 1;
                continue;
            };
            for &index in indices {
                routes[index]
                    .trips
                    .insert(trip.trip_id.clone(), TripDocument::from(trip));
            }
        }

        if orphans > 0 {
            debug!("dropped {} trips with an unknown route_id", orphans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{route, trip};
    use crate::pipeline::RouteAssembler;
    use crate::CsvTable;

    #[test]
    fn nests_trips_under_their_route() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1"), route("R2")]);
        let mut headed = trip("R2", "T2", "S2", Some("G1"));
        headed.trip_headsign = "Downtown".to_string();
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id"],
            vec![trip("R1", "T1", "S1", None), headed, trip("R7", "T3", "S1", None)],
        );

        let mut routes = Vec::new();
        RouteAssembler.apply(&feed, &mut routes);
        TripJoiner.apply(&feed, &mut routes);

        assert_eq!(routes[0].trips.len(), 1);
        assert!(routes[0].trips.contains_key("T1"));
        let nested = &routes[1].trips["T2"];
        assert_eq!(nested.service_id.as_str(), "S2");
        assert_eq!(nested.trip_headsign, "Downtown");
        assert_eq!(nested.shape_id.as_ref().map(|id| id.as_str()), Some("G1"));
        assert!(nested.stops.is_empty());
        assert!(nested.days.is_empty());
    }
}
