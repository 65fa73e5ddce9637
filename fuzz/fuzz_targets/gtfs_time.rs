#![no_main]
use gtfs_nest_model::GtfsTime;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(time) = GtfsTime::parse(data) {
        let rendered = time.to_string();
        assert_eq!(GtfsTime::parse(&rendered).ok(), Some(time));
    }
});
