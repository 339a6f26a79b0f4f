#![no_main]

use addrstat::tokenizer::SEGMENT_DELIMITER;
use addrstat::{Statistics, Tokenizer};
use libfuzzer_sys::fuzz_target;

// Feeds raw segments straight into the tokenizer, bypassing the buffer limit.
fuzz_target!(|data: &[u8]| {
    let mut tokenizer = Tokenizer::new();
    let mut stats = Statistics::new();
    for segment in data.split_inclusive(|b| *b == SEGMENT_DELIMITER) {
        if tokenizer.feed(segment, &mut stats).is_err() {
            return;
        }
    }
    let _ = tokenizer.finish(&mut stats);
    assert!(tokenizer.committed() >= stats.items_seen());
    assert!(stats.is_consistent());
});
