use gtfs_nest_model::{RouteDocument, ShapePoint};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::pipeline::{route_index, Stage};
use crate::GtfsFeed;

/// Attaches shape points to every route whose trips reference the shape.
///
/// A shape used by trips of several routes is copied into each of them.
/// Points keep shapes.txt order.
#[derive(Debug, Default)]
pub struct ShapeJoiner;

impl Stage for ShapeJoiner {
    fn name(&self) -> &'static str {
        "shape_joiner"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        let routes_by_id = route_index(routes);

        let mut seen: FxHashSet<(&str, usize)> = FxHashSet::default();
        let mut routes_by_shape: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
        for trip in &feed.trips.rows {
            let Some(shape_id) = trip.shape_id.as_ref() else {
                continue;
            };
            let Some(indices) = routes_by_id.get(trip.route_id.as_str()) else {
                continue;
            };
            for &index in indices {
                if seen.insert((shape_id.as_str(), index)) {
                    routes_by_shape
                        .entry(shape_id.as_str())
                        .or_default()
                        .push(index);
                }
            }
        }

        for (shape_id, indices) in &routes_by_shape {
            for &index in indices {
                routes[index]
                    .shapes
                    .entry((*shape_id).into())
                    .or_default();
            }
        }

        let mut unused_points = 0usize;
        for row in &feed.shapes.rows {
            let Some(indices) = routes_by_shape.get(row.shape_id.as_str()) else {
                unused_points += 1;
                continue;
            };
            let point = ShapePoint::from(row);
            for &index in indices {
                if let Some(shape) = routes[index].shapes.get_mut(row.shape_id.as_str()) {
                    shape.points.push(point.clone());
                }
            }
        }

        if unused_points > 0 {
            debug!("dropped {} shape points not used by any route", unused_points);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{route, trip};
    use crate::pipeline::RouteAssembler;
    use crate::CsvTable;
    use gtfs_nest_model::{FeedId, Shape};

    fn point(shape_id: &str, sequence: u32) -> Shape {
        Shape {
            shape_id: FeedId::from(shape_id),
            shape_pt_lat: 45.0 + f64::from(sequence),
            shape_pt_lon: -73.0,
            shape_pt_sequence: sequence,
            shape_dist_traveled: None,
        }
    }

    fn run(feed: &GtfsFeed) -> Vec<RouteDocument> {
        let mut routes = Vec::new();
        RouteAssembler.apply(feed, &mut routes);
        ShapeJoiner.apply(feed, &mut routes);
        routes
    }

    #[test]
    fn attaches_points_in_file_order() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id", "shape_id"],
            vec![
                trip("R1", "T1", "S1", Some("G1")),
                trip("R1", "T2", "S1", Some("G1")),
            ],
        );
        feed.shapes = CsvTable::from_rows(
            &["shape_id"],
            vec![point("G1", 2), point("G1", 1), point("G1", 3)],
        );

        let routes = run(&feed);
        let shape = &routes[0].shapes["G1"];
        let sequences: Vec<u32> = shape.points.iter().map(|p| p.shape_pt_sequence).collect();
        assert_eq!(sequences, vec![2, 1, 3]);
    }

    #[test]
    fn shared_shape_goes_to_every_route() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1"), route("R2")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id", "shape_id"],
            vec![
                trip("R1", "T1", "S1", Some("G1")),
                trip("R2", "T2", "S1", Some("G1")),
            ],
        );
        feed.shapes = CsvTable::from_rows(&["shape_id"], vec![point("G1", 1), point("G1", 2)]);

        let routes = run(&feed);
        assert_eq!(routes[0].shapes["G1"].points.len(), 2);
        assert_eq!(routes[1].shapes["G1"].points.len(), 2);
    }

    #[test]
    fn drops_unreferenced_shapes_and_shapeless_trips() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id"],
            vec![trip("R1", "T1", "S1", None), trip("R404", "T2", "S1", Some("G2"))],
        );
        feed.shapes = CsvTable::from_rows(&["shape_id"], vec![point("G2", 1), point("G3", 1)]);

        let routes = run(&feed);
        assert!(routes[0].shapes.is_empty());
    }

    #[test]
    fn referenced_shape_without_points_is_empty() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R1")]);
        feed.trips = CsvTable::from_rows(
            &["route_id", "service_id", "trip_id", "shape_id"],
            vec![trip("R1", "T1", "S1", Some("G9"))],
        );

        let routes = run(&feed);
        assert!(routes[0].shapes["G9"].points.is_empty());
    }
}
