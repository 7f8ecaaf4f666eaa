/// Lin-log luma compression approximating photoreceptor response.
use crate::error::{Result, StorageError};
use crate::slice::Plane;
use constants::perceptual::{BT709_WEIGHTS, LUMA_SCALE};

/// Linear below `threshold`, natural log above; both branches equal `ln(threshold)` at the threshold.
pub fn lin_log_value(luma: f64, threshold: f64) -> f64 {
    let f = threshold.ln() / threshold;
    if luma <= threshold { luma * f } else { luma.ln() }
}

/// BT.709 luma of normalised RGB, scaled to the 8-bit range.
pub fn luma(r: f64, g: f64, b: f64) -> f64 {
    LUMA_SCALE * (r * BT709_WEIGHTS[0] + g * BT709_WEIGHTS[1] + b * BT709_WEIGHTS[2])
}

/// Map an RGBA plane of the sensor resolution to a single-channel lin-log plane.
///
/// `sensor` is (height, width). Computation runs in f64 and the result is
/// cast back to f32.
pub fn lin_log(plane: &Plane<f32>, threshold: f64, sensor: (usize, usize)) -> Result<Plane<f32>> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(StorageError::InvalidConfig(format!(
            "lin-log threshold must be positive, got {}",
            threshold
        )));
    }

    let (height, width) = sensor;
    if plane.height != height || plane.width != width || plane.channels < 3 {
        return Err(StorageError::ShapeMismatch {
            expected: (height, width, 4),
            actual: plane.shape(),
        });
    }

    let data = plane
        .data
        .chunks_exact(plane.channels)
        .map(|px| {
            let y = luma(px[0] as f64, px[1] as f64, px[2] as f64);
            lin_log_value(y, threshold) as f32
        })
        .collect();

    Ok(Plane {
        rows: plane.rows,
        cols: plane.cols,
        height,
        width,
        channels: 1,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Axis;
    use constants::perceptual::LIN_LOG_THRESHOLD;

    const EPS: f64 = 1e-12;

    #[test]
    fn branches_meet_at_threshold() {
        let t = LIN_LOG_THRESHOLD;
        let linear = t * (t.ln() / t);
        assert!((lin_log_value(t, t) - t.ln()).abs() < EPS);
        assert!((linear - t.ln()).abs() < EPS);
        assert!((lin_log_value(t + 1e-9, t) - t.ln()).abs() < 1e-9);
    }

    #[test]
    fn zero_luma_maps_to_zero() {
        assert_eq!(lin_log_value(0.0, LIN_LOG_THRESHOLD), 0.0);
    }

    #[test]
    fn bright_luma_is_logarithmic() {
        assert!((lin_log_value(255.0, LIN_LOG_THRESHOLD) - 255f64.ln()).abs() < EPS);
    }

    #[test]
    fn white_pixel_has_full_scale_luma() {
        assert!((luma(1.0, 1.0, 1.0) - 255.0).abs() < 1e-9);
    }

    #[test]
    fn transforms_rgba_plane() {
        let mut plane = Plane::<f32>::zeros(Axis::Y, Axis::X, 2, 3, 4);
        plane.at_mut(1, 2).copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);

        let out = lin_log(&plane, LIN_LOG_THRESHOLD, (2, 3)).unwrap();
        assert_eq!(out.shape(), (2, 3, 1));
        assert_eq!(out.at(0, 0), &[0.0]);
        assert!((out.at(1, 2)[0] - 255f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn rejects_plane_of_other_resolution() {
        let plane = Plane::<f32>::zeros(Axis::Y, Axis::X, 4, 4, 4);
        let err = lin_log(&plane, LIN_LOG_THRESHOLD, (720, 1280)).unwrap_err();
        assert!(matches!(
            err,
            StorageError::ShapeMismatch {
                expected: (720, 1280, 4),
                actual: (4, 4, 4)
            }
        ));
    }

    #[test]
    fn rejects_single_channel_plane() {
        let plane = Plane::<f32>::zeros(Axis::Y, Axis::X, 2, 2, 1);
        assert!(matches!(
            lin_log(&plane, LIN_LOG_THRESHOLD, (2, 2)),
            Err(StorageError::ShapeMismatch { .. })
        ));
    }
}
