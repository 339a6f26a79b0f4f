//! Common test helpers and fixtures shared across the test suite.

use addrstat::{aggregate, PipelineConfig, Statistics};
use std::io::Cursor;

/// Reference stream: six valid records (one address twice), two broken
/// records, one empty record and one record without a city.
#[allow(dead_code)]
pub const FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root>
<item city="Барнаул" street="Дальняя улица" house="56" floor="2" />

<item />

<item house="6" floor="3" />
<item city= street="Дальняя улица" house="6" floor="3" />

<item city="Братск" street="Большая Октябрьская улица" house="65" floor="5" />
<item city="Барнаул" street="Дальняя улица" house="6" floor="3" />
<item city="Барнаул" street="Ближняя улица" house="6" floor="2" />
<item city="Барнаул" street="Дальняя улица" house="56" floor="3" />

<item city="Братск" street="Большая Октябрьская улица" house="66" floor="7" />
</root>
"#;

/// One address record for generated streams.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Row {
    pub city: String,
    pub street: String,
    pub house: String,
    pub floor: u16,
}

/// Render rows as a complete stream.
#[allow(dead_code)]
pub fn render(rows: &[Row]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root>\n");
    for row in rows {
        out.push_str(&format!(
            "<item city=\"{}\" street=\"{}\" house=\"{}\" floor=\"{}\" />\n",
            row.city, row.street, row.house, row.floor
        ));
    }
    out.push_str("</root>\n");
    out
}

/// Aggregate an in-memory stream, panicking on fatal errors.
pub fn stats_for(input: &str, config: &PipelineConfig) -> Statistics {
    aggregate(Cursor::new(input.as_bytes().to_vec()), config).expect("aggregation failed")
}
