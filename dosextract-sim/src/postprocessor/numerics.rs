use super::PostProcessorError;

/// `n` evenly spaced values from `start` to `end` inclusive. A single value is `start`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Trapezoidal integral of `y` sampled at the ordered abscissae `x`
pub fn trapz(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

/// The derivative of `y` with respect to `x`, from a forward difference at the first sample, a backward
/// difference at the last and central differences in between
pub fn deriv(y: &[f64], x: &[f64]) -> Result<Vec<f64>, PostProcessorError> {
    if x.len() != y.len() {
        return Err(PostProcessorError::InconsistentDimensions {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(PostProcessorError::TooFewPoints(n));
    }
    Ok((0..n)
        .map(|i| {
            let (lower, upper) = (i.saturating_sub(1), (i + 1).min(n - 1));
            (y[upper] - y[lower]) / (x[upper] - x[lower])
        })
        .collect())
}

/// Linear interpolation of the samples `(x, y)` at `x_new`. The abscissae must ascend, and points outside
/// `[x[0], x[n - 1]]` give NaN.
pub fn interp1(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    let n = x.len();
    if n == 0 || x_new.is_nan() || x_new < x[0] || x_new > x[n - 1] {
        return f64::NAN;
    }
    // First index with x[idx] >= x_new
    let idx = x.partition_point(|&value| value < x_new);
    if x[idx] == x_new {
        return y[idx];
    }
    let (x0, x1, y0, y1) = (x[idx - 1], x[idx], y[idx - 1], y[idx]);
    ((x_new - x1) * y0 - (x_new - x0) * y1) / (x0 - x1)
}

/// The squared L2 distance between `interpolated` and `simulated` over the abscissae `voltage - shift`.
///
/// Pairs in which either value is NaN are left out of the integral.
pub fn error_l2(interpolated: &[f64], simulated: &[f64], voltage: &[f64], shift: f64) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = interpolated
        .iter()
        .zip(simulated.iter())
        .zip(voltage.iter())
        .filter(|((a, b), _)| !a.is_nan() && !b.is_nan())
        .map(|((a, b), v)| (v - shift, (a - b).powi(2)))
        .unzip();
    trapz(&x, &y)
}
