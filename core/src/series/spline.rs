//! Natural cubic spline over a strictly increasing abscissa.

/// Second derivatives of the natural spline through `(x, y)`.
pub fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    if n < 3 {
        return y2;
    }
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope_change = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope_change / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

/// Evaluates the spline inside interval `[x[lo], x[lo + 1]]`.
pub fn evaluate(x: &[f64], y: &[f64], y2: &[f64], lo: usize, t: f64) -> f64 {
    let hi = lo + 1;
    let h = x[hi] - x[lo];
    let a = (x[hi] - t) / h;
    let b = (t - x[lo]) / h;
    a * y[lo] + b * y[hi] + ((a * a * a - a) * y2[lo] + (b * b * b - b) * y2[hi]) * (h * h) / 6.0
}
