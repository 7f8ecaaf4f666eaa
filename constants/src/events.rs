/// Text event stream layout

/// Header lines preceding the first event record
pub const EVENT_HEADER_LINES: usize = 6;

/// Multiplier turning a timestamp in seconds into a time-axis index (milliseconds)
pub const TIMESTAMP_SCALE: f64 = 1000.0;

/// Polarity value marking an ON event, every other value is OFF
pub const ON_POLARITY: i32 = 1;
