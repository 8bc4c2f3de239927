//! Summary statistics over gap sizes
//!
//! Accumulates in f64 so long documents don't drift, returns f32 to match
//! the coordinate type used everywhere else.

/// Population mean and standard deviation of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f32,
    pub std_dev: f32,
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f32]) -> Option<f32> {
    mean_f64(values).map(|m| m as f32)
}

/// Population standard deviation, `None` for an empty slice
pub fn std_dev(values: &[f32]) -> Option<f32> {
    let mean = mean_f64(values)?;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt() as f32)
}

/// Mean and standard deviation in one call
pub fn summarize(values: &[f32]) -> Option<Summary> {
    Some(Summary {
        count: values.len(),
        mean: mean(values)?,
        std_dev: std_dev(values)?,
    })
}

fn mean_f64(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_uniform_sample_has_zero_spread() {
        let s = summarize(&[10.0, 10.0, 10.0]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 10.0);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        // Classic textbook sample: mean 5, population sigma 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-6);
        assert!((std_dev(&values).unwrap() - 2.0).abs() < 1e-6);
    }
}
