#![no_main]

use addrstat::{aggregate, PipelineConfig};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let config = PipelineConfig::default().with_read_size(64);
    if let Ok(stats) = aggregate(Cursor::new(data), &config) {
        assert!(stats.is_consistent());
    }
});
