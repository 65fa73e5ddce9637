#![no_main]
use gtfs_nest_core::csv_reader::read_csv_from_reader;
use gtfs_nest_core::feed::STOP_TIMES_REQUIRED_COLUMNS;
use gtfs_nest_model::StopTime;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = read_csv_from_reader::<StopTime, _>(data, "stop_times.txt", STOP_TIMES_REQUIRED_COLUMNS);
});
