/// Event camera sensor resolution used by the renderer output

/// Sensor width in pixels
pub const SENSOR_WIDTH: usize = 1280;

/// Sensor height in pixels
pub const SENSOR_HEIGHT: usize = 720;

/// Sensor resolution as (height, width), matching plane row/column order
pub const SENSOR_RESOLUTION: (usize, usize) = (SENSOR_HEIGHT, SENSOR_WIDTH);
