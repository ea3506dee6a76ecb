/// RMS level of a block of PCM samples, normalised to 0.0..=1.0
pub fn rms_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();

    let rms = (sum_squares / samples.len() as f64).sqrt();
    rms.min(1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_zero() {
        assert_eq!(rms_level(&[]), 0.0);
        assert_eq!(rms_level(&[0; 160]), 0.0);
    }

    #[test]
    fn full_scale_square_wave_is_one() {
        let samples: Vec<i16> = (0..160)
            .map(|i| if i % 2 == 0 { i16::MAX } else { -i16::MAX })
            .collect();
        assert!((rms_level(&samples) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn level_never_exceeds_one() {
        assert!(rms_level(&[i16::MIN; 32]) <= 1.0);
    }
}
