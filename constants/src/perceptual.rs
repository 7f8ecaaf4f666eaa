/// Photoreceptor-style lin-log transform parameters

/// Luma value where the response switches from linear to logarithmic
pub const LIN_LOG_THRESHOLD: f64 = 20.0;

/// Scale from normalised [0, 1] colour to the 8-bit luma range
pub const LUMA_SCALE: f64 = 255.0;

/// BT.709 luma weights for R, G, B
pub const BT709_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];
