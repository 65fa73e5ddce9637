use gtfs_nest_model::{DaysOfWeek, RouteDocument};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::pipeline::Stage;
use crate::GtfsFeed;

/// Fills `days` for each trip from the calendar row(s) of its service.
///
/// Multiple rows for one service are merged. A service missing from
/// calendar.txt leaves the trip with no days.
#[derive(Debug, Default)]
pub struct ServiceDayResolver;

impl Stage for ServiceDayResolver {
    fn name(&self) -> &'static str {
        "service_day_resolver"
    }

    fn apply(&self, feed: &GtfsFeed, routes: &mut Vec<RouteDocument>) {
        let mut days_by_service: FxHashMap<&str, DaysOfWeek> = FxHashMap::default();
        for row in &feed.calendar.rows {
            days_by_service
                .entry(row.service_id.as_str())
                .or_default()
                .union(&row.days_of_week());
        }

        let mut unresolved = 0usize;
        for trip in routes.iter_mut().flat_map(|route| route.trips.values_mut()) {
            match days_by_service.get(trip.service_id.as_str()) {
                Some(days) => trip.days = days.active_days(),
                None => {
                    trip.days.clear();
                    unresolved += 1;
                }
            }
        }

        if unresolved > 0 {
            debug!("{} trips reference a service_id absent from calendar", unresolved);
        }
    }
}
