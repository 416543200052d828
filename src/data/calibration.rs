use thiserror::Error;

use super::model::{CalibratedSeries, CalibrationParameters, RawScan};

/// Constant detector offset subtracted from every 2θ sample, in degrees.
pub const ZERO_OFFSET: f64 = 0.544;
/// Angle-proportional part of the detector correction.
pub const SLOPE_CORRECTION: f64 = 0.000599591;

/// Fewest readings that leave a non-empty calibrated series.
pub const MIN_READINGS: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("scan has {found} readings, at least {} are required", MIN_READINGS)]
    TooFewReadings { found: usize },
    #[error("2θ start and 2θ end are both {angle}, the angular range is empty")]
    DegenerateRange { angle: f64 },
    #[error("2θ bounds must be finite numbers")]
    NonFiniteBound,
}

/// Instrument correction for one linear 2θ sample, rounded to 3 decimals.
pub fn correct_angle(two_theta: f64) -> f64 {
    round3(two_theta - (ZERO_OFFSET + SLOPE_CORRECTION * two_theta))
}

/// Round half-to-even on the exact decimal expansion, the same result as
/// formatting with `%.3f` and reading the text back.
fn round3(v: f64) -> f64 {
    format!("{v:.3}").parse().unwrap_or(v)
}

/// Map a raw scan onto calibrated 2θ.
///
/// With `n` readings the ramp has `n - 1` samples spaced
/// `(max - min) / (n - 2)` apart. The first ramp sample and the reference
/// reading are dropped, and the ramp is paired with the readings shifted by
/// one, so the result always holds `n - 2` points. These index shifts are
/// part of the instrument correction and must not be "fixed".
pub fn calibrate(
    scan: &RawScan,
    params: CalibrationParameters,
) -> Result<CalibratedSeries, CalibrationError> {
    let CalibrationParameters {
        min_angle,
        max_angle,
    } = params;

    if !min_angle.is_finite() || !max_angle.is_finite() {
        return Err(CalibrationError::NonFiniteBound);
    }
    if min_angle == max_angle {
        return Err(CalibrationError::DegenerateRange { angle: min_angle });
    }
    let n = scan.len();
    if n < MIN_READINGS {
        return Err(CalibrationError::TooFewReadings { found: n });
    }

    let step = (max_angle - min_angle) / (n - 2) as f64;

    // Ramp sample i pairs with raw reading i, both for i in 1..n-1.
    let series: CalibratedSeries = (1..n - 1)
        .map(|i| (correct_angle(min_angle + i as f64 * step), scan.values[i]))
        .collect();

    log::debug!(
        "calibrated {n} readings over {min_angle}..{max_angle} (step {step}) into {} points",
        series.len()
    );

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(values: &[f64]) -> RawScan {
        RawScan::new(values.to_vec())
    }

    #[test]
    fn four_readings_give_two_points() {
        let raw = scan(&[999.0, 10.0, 20.0, 30.0]);
        let series = calibrate(&raw, CalibrationParameters::new(10.0, 20.0)).unwrap();

        assert_eq!(series.len(), 2);
        // ramp is [10, 15, 20]; the first sample is dropped
        assert_eq!(series.angle(), &[14.447, 19.444]);
        assert_eq!(series.angle()[0], correct_angle(15.0));
        assert_eq!(series.angle()[1], correct_angle(20.0));
        // reference reading skipped, last reading dropped
        assert_eq!(series.intensity(), &[10.0, 20.0]);
    }

    #[test]
    fn output_length_is_n_minus_two() {
        for n in MIN_READINGS..40 {
            let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let series = calibrate(&scan(&values), CalibrationParameters::new(5.0, 80.0)).unwrap();
            assert_eq!(series.len(), n - 2, "n = {n}");
            assert_eq!(series.angle().len(), series.intensity().len());
        }
    }

    #[test]
    fn three_readings_keep_one_point() {
        let series =
            calibrate(&scan(&[0.0, 7.0, 8.0]), CalibrationParameters::new(20.0, 30.0)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.angle()[0], correct_angle(30.0));
        assert_eq!(series.intensity(), &[7.0]);
    }

    #[test]
    fn two_readings_are_rejected() {
        let err =
            calibrate(&scan(&[1.0, 2.0]), CalibrationParameters::new(10.0, 20.0)).unwrap_err();
        assert_eq!(err, CalibrationError::TooFewReadings { found: 2 });

        let err = calibrate(&scan(&[]), CalibrationParameters::new(10.0, 20.0)).unwrap_err();
        assert_eq!(err, CalibrationError::TooFewReadings { found: 0 });
    }

    #[test]
    fn equal_bounds_are_rejected() {
        let params = CalibrationParameters::new(15.0, 15.0);
        let err = calibrate(&scan(&[1.0, 2.0, 3.0]), params).unwrap_err();
        assert_eq!(err, CalibrationError::DegenerateRange { angle: 15.0 });
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        let raw = scan(&[1.0, 2.0, 3.0]);
        assert_eq!(
            calibrate(&raw, CalibrationParameters::new(f64::NAN, 15.0)),
            Err(CalibrationError::NonFiniteBound)
        );
        assert_eq!(
            calibrate(&raw, CalibrationParameters::new(0.0, f64::INFINITY)),
            Err(CalibrationError::NonFiniteBound)
        );
    }

    #[test]
    fn ascending_bounds_give_non_decreasing_angles() {
        let values: Vec<f64> = (0..2000).map(|i| (i % 17) as f64).collect();
        let series = calibrate(&scan(&values), CalibrationParameters::new(10.0, 90.0)).unwrap();
        assert!(series.angle().windows(2).all(|w| w[0] <= w[1]));

        let series = calibrate(&scan(&values), CalibrationParameters::new(90.0, 10.0)).unwrap();
        assert!(series.angle().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn angles_have_three_decimals() {
        let values: Vec<f64> = (0..101).map(|i| i as f64).collect();
        let series = calibrate(&scan(&values), CalibrationParameters::new(10.123, 47.891)).unwrap();
        for &a in series.angle() {
            assert_eq!(a, format!("{a:.3}").parse::<f64>().unwrap());
        }
    }

    #[test]
    fn missing_readings_pass_through() {
        let series = calibrate(
            &scan(&[f64::NAN, 1.0, f64::NAN, 3.0]),
            CalibrationParameters::new(0.0, 10.0),
        )
        .unwrap();
        assert_eq!(series.intensity()[0], 1.0);
        assert!(series.intensity()[1].is_nan());
    }
}
