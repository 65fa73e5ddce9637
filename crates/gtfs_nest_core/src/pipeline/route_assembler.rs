use gtfs_nest_model::RouteDocument;

use crate::pipeline::Stage;
use crate::GtfsFeed;

/// One document per routes.txt row, in file order, with empty containers.
#[derive(Debug, Default)]
pub struct RouteAssembler;

impl Stage for RouteAssembler {
    fn name(&self) -> &'static str {
        "route_assembler"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        routes.clear();
        routes.reserve(feed.routes.len());
        routes.extend(feed.routes.rows.iter().cloned().map(RouteDocument::new));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::route;
    use crate::CsvTable;

    #[test]
    fn keeps_route_order_and_attributes() {
        let mut feed = GtfsFeed::default();
        let mut second = route("R2");
        second.route_long_name = Some("Harbour Line".to_string());
        feed.routes = CsvTable::from_rows(&["route_id"], vec![route("R9"), second]);

        let mut routes = Vec::new();
        RouteAssembler.apply(&feed, &mut routes);

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].route_id().as_str(), "R9");
        assert_eq!(routes[1].route.route_long_name.as_deref(), Some("Harbour Line"));
        assert!(routes.iter().all(|r| r.shapes.is_empty() && r.trips.is_empty()));
    }
}
