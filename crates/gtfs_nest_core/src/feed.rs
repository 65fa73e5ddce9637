use gtfs_nest_model::{Calendar, Route, Shape, Stop, StopTime, Trip};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::progress::ProgressHandler;
use crate::{CsvTable, GtfsInput, GtfsInputError, GtfsInputReader};

pub const ROUTES_FILE: &str = "routes.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const SHAPES_FILE: &str = "shapes.txt";
pub const STOPS_FILE: &str = "stops.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";

/// Tables in load order.
pub const GTFS_FILE_NAMES: &[&str] = &[
    ROUTES_FILE,
    TRIPS_FILE,
    SHAPES_FILE,
    STOPS_FILE,
    STOP_TIMES_FILE,
    CALENDAR_FILE,
];

pub const ROUTES_REQUIRED_COLUMNS: &[&str] = &[
    "route_id",
    "route_short_name",
    "route_long_name",
    "route_color",
    "route_text_color",
    "route_desc",
];
pub const TRIPS_REQUIRED_COLUMNS: &[&str] = &[
    "route_id",
    "service_id",
    "trip_id",
    "shape_id",
    "trip_short_name",
    "trip_headsign",
];
pub const SHAPES_REQUIRED_COLUMNS: &[&str] = &[
    "shape_id",
    "shape_pt_lat",
    "shape_pt_lon",
    "shape_pt_sequence",
];
pub const STOPS_REQUIRED_COLUMNS: &[&str] = &[
    "stop_id",
    "stop_code",
    "stop_name",
    "stop_lat",
    "stop_lon",
];
pub const STOP_TIMES_REQUIRED_COLUMNS: &[&str] = &[
    "trip_id",
    "stop_id",
    "arrival_time",
    "departure_time",
    "stop_sequence",
];
pub const CALENDAR_REQUIRED_COLUMNS: &[&str] = &[
    "service_id",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "start_date",
    "end_date",
];

/// The six source tables, loaded once and read-only for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct GtfsFeed {
    pub routes: CsvTable<Route>,
    pub trips: CsvTable<Trip>,
    pub shapes: CsvTable<Shape>,
    pub stops: CsvTable<Stop>,
    pub stop_times: CsvTable<StopTime>,
    pub calendar: CsvTable<Calendar>,
}

impl GtfsFeed {
    pub fn from_input(input: &GtfsInput) -> Result<Self, GtfsInputError> {
        Self::from_input_with_progress(input, None)
    }

    pub fn from_input_with_progress(
        input: &GtfsInput,
        progress: Option<&dyn ProgressHandler>,
    ) -> Result<Self, GtfsInputError> {
        let reader = input.reader();
        Self::from_reader_with_progress(&reader, progress)
    }

    pub fn from_reader_with_progress(
        reader: &GtfsInputReader,
        progress: Option<&dyn ProgressHandler>,
    ) -> Result<Self, GtfsInputError> {
        if let Some(progress) = progress {
            progress.set_total_files(GTFS_FILE_NAMES.len());
        }

        let routes = load_table(reader, ROUTES_FILE, ROUTES_REQUIRED_COLUMNS, true, progress)?;
        let trips = load_table(reader, TRIPS_FILE, TRIPS_REQUIRED_COLUMNS, true, progress)?;
        let shapes = load_table(reader, SHAPES_FILE, SHAPES_REQUIRED_COLUMNS, false, progress)?;
        let stops = load_table(reader, STOPS_FILE, STOPS_REQUIRED_COLUMNS, true, progress)?;
        let stop_times = load_table(
            reader,
            STOP_TIMES_FILE,
            STOP_TIMES_REQUIRED_COLUMNS,
            true,
            progress,
        )?;
        let calendar = load_table(
            reader,
            CALENDAR_FILE,
            CALENDAR_REQUIRED_COLUMNS,
            false,
            progress,
        )?;

        Ok(Self {
            routes,
            trips,
            shapes,
            stops,
            stop_times,
            calendar,
        })
    }
}

fn load_table<T: DeserializeOwned>(
    reader: &GtfsInputReader,
    file_name: &str,
    required_columns: &[&str],
    required_file: bool,
    progress: Option<&dyn ProgressHandler>,
) -> Result<CsvTable<T>, GtfsInputError> {
    if let Some(progress) = progress {
        progress.on_start_file_load(file_name);
    }
    let table = if required_file {
        reader.read_required_csv(file_name, required_columns)?
    } else {
        match reader.read_optional_csv(file_name, required_columns)? {
            Some(table) => table,
            None => {
                info!("{} not present, using an empty table", file_name);
                CsvTable::default()
            }
        }
    };
    info!("loaded {} rows from {}", table.len(), file_name);
    if let Some(progress) = progress {
        progress.on_finish_file_load(file_name, table.len());
    }
    Ok(table)
}
