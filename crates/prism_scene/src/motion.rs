//! Motion samples.
//!
//! The native renderer spreads motion keys evenly across the shutter, so any
//! time-sampled input must use uniformly spaced sample times.

use prism_core::{PrismError, Result};
use smallvec::SmallVec;

/// Sample times; almost always two to four entries.
pub type SampleTimes = SmallVec<[f32; 4]>;

/// Relative tolerance, as a fraction of the sampled interval.
const UNIFORM_TOLERANCE: f32 = 0.001;

/// Fails with [`PrismError::NonUniformSamples`] unless `times` are finite,
/// strictly increasing and evenly spaced between the first and last sample.
pub fn ensure_uniform_samples(times: &[f32]) -> Result<()> {
    let non_uniform = || PrismError::NonUniformSamples {
        times: times.to_vec(),
    };
    if !times.iter().all(|t| t.is_finite()) || !times.windows(2).all(|w| w[0] < w[1]) {
        return Err(non_uniform());
    }

    let n = times.len();
    if n < 3 {
        return Ok(());
    }
    let first = times[0];
    let last = times[n - 1];
    let span = last - first;
    let tolerance = UNIFORM_TOLERANCE * span.abs();
    for (i, &t) in times.iter().enumerate() {
        let expected = first + span * i as f32 / (n - 1) as f32;
        if (t - expected).abs() > tolerance {
            return Err(non_uniform());
        }
    }
    Ok(())
}

pub fn check_sample_count(samples: usize, times: usize) -> Result<()> {
    if samples == times && samples > 0 {
        Ok(())
    } else {
        Err(PrismError::SampleCountMismatch { samples, times })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_uniform_times_are_rejected() {
        assert!(matches!(
            ensure_uniform_samples(&[0.0, 0.2, 0.5, 1.0]),
            Err(PrismError::NonUniformSamples { .. })
        ));
    }

    #[test]
    fn test_unordered_or_non_finite_times_are_rejected() {
        for times in [
            &[0.0, f32::NAN, 1.0][..],
            &[f32::NAN, f32::NAN, f32::NAN],
            &[1.0, 0.5, 0.0],
            &[0.0, f32::INFINITY],
            &[0.5, 0.5],
        ] {
            assert!(
                matches!(ensure_uniform_samples(times), Err(PrismError::NonUniformSamples { .. })),
                "{times:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_uniform_times_are_accepted() {
        ensure_uniform_samples(&[0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();
        ensure_uniform_samples(&[-0.25, 0.25]).unwrap();
        ensure_uniform_samples(&[0.5]).unwrap();
    }

    #[test]
    fn test_sample_count() {
        assert!(check_sample_count(2, 2).is_ok());
        assert!(check_sample_count(2, 3).is_err());
        assert!(check_sample_count(0, 0).is_err());
    }
}
