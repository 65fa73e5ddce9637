//! The nested, route-oriented document produced from the flat tables.
//!
//! One [`RouteDocument`] per row of routes.txt. Shapes and trips are keyed by
//! id in ordered maps so the serialized document is identical between runs.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::{FeedId, GtfsTime, Route, Shape, Stop, StopTime, Trip, Weekday};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteDocument {
    #[serde(flatten)]
    pub route: Route,
    pub shapes: BTreeMap<FeedId, ShapeDocument>,
    pub trips: BTreeMap<FeedId, TripDocument>,
}

impl RouteDocument {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            shapes: BTreeMap::new(),
            trips: BTreeMap::new(),
        }
    }

    pub fn route_id(&self) -> &FeedId {
        &self.route.route_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapeDocument {
    pub points: Vec<ShapePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapePoint {
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_dist_traveled: Option<f64>,
}

impl From<&Shape> for ShapePoint {
    fn from(row: &Shape) -> Self {
        Self {
            shape_pt_lat: row.shape_pt_lat,
            shape_pt_lon: row.shape_pt_lon,
            shape_pt_sequence: row.shape_pt_sequence,
            shape_dist_traveled: row.shape_dist_traveled,
        }
    }
}

/// A trip as nested under its route. `route_id` is implied by the parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripDocument {
    pub trip_id: FeedId,
    pub service_id: FeedId,
    pub shape_id: Option<FeedId>,
    pub trip_short_name: String,
    pub trip_headsign: String,
    pub stops: Vec<StopVisit>,
    pub days: Vec<Weekday>,
    #[serde(flatten)]
    pub summary: TripSummary,
}

impl From<&Trip> for TripDocument {
    fn from(row: &Trip) -> Self {
        Self {
            trip_id: row.trip_id.clone(),
            service_id: row.service_id.clone(),
            shape_id: row.shape_id.clone(),
            trip_short_name: row.trip_short_name.clone(),
            trip_headsign: row.trip_headsign.clone(),
            stops: Vec::new(),
            days: Vec::new(),
            summary: TripSummary::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopVisit {
    pub stop_id: FeedId,
    pub arrival_time: Option<GtfsTime>,
    pub departure_time: Option<GtfsTime>,
    pub stop_sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_dist_traveled: Option<f64>,
    /// Present once the visit has been matched against stops.txt.
    #[serde(flatten)]
    pub details: Option<StopDetails>,
}

impl From<&StopTime> for StopVisit {
    fn from(row: &StopTime) -> Self {
        Self {
            stop_id: row.stop_id.clone(),
            arrival_time: row.arrival_time,
            departure_time: row.departure_time,
            stop_sequence: row.stop_sequence,
            shape_dist_traveled: row.shape_dist_traveled,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopDetails {
    pub stop_code: Option<String>,
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
}

impl From<&Stop> for StopDetails {
    fn from(row: &Stop) -> Self {
        Self {
            stop_code: row.stop_code.clone(),
            stop_name: row.stop_name.clone(),
            stop_lat: row.stop_lat,
            stop_lon: row.stop_lon,
        }
    }
}

/// First/last stop fields of a trip.
///
/// `None` serializes as the sentinel: `""` for times, `0` for stop ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripSummary {
    #[serde(serialize_with = "time_or_empty")]
    pub first_departure_time: Option<GtfsTime>,
    #[serde(serialize_with = "stop_id_or_zero")]
    pub first_stop_id: Option<FeedId>,
    #[serde(serialize_with = "time_or_empty")]
    pub last_arrival_time: Option<GtfsTime>,
    #[serde(serialize_with = "stop_id_or_zero")]
    pub last_stop_id: Option<FeedId>,
}

impl TripSummary {
    pub fn from_visits(visits: &[StopVisit]) -> Self {
        match (visits.first(), visits.last()) {
            (Some(first), Some(last)) => Self {
                first_departure_time: first.departure_time,
                first_stop_id: Some(first.stop_id.clone()),
                last_arrival_time: last.arrival_time,
                last_stop_id: Some(last.stop_id.clone()),
            },
            _ => Self::default(),
        }
    }
}

fn time_or_empty<S: Serializer>(value: &Option<GtfsTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(time) => time.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

fn stop_id_or_zero<S: Serializer>(value: &Option<FeedId>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(id) => id.serialize(serializer),
        None => serializer.serialize_u8(0),
    }
}
