use crate::fingerprint::HtmlResult;
use crate::strategy::DelayStrategy;

/// Weighted linear regression over residuals `(Δt, sim − target)`, seeded
/// with `(0, 1 − target)`. Falls back to the Simple-style multiplicative
/// correction when the fitted line is degenerate.
pub struct BisectionStrategy {
    default_delay: f64,
    target: f64,
    hist: Vec<(f64, f64)>,
    last: Option<(f64, HtmlResult)>,
}

impl BisectionStrategy {
    pub fn new(default_delay: f64, target: f64) -> Self {
        Self {
            default_delay,
            target,
            hist: vec![(0.0, 1.0 - target)],
            last: None,
        }
    }

    /// Closed-form weighted least squares fit of `y = a*x + b`, weights
    /// `w_i = (i+1) * (1 - |y_i|)^2` (1-indexed age, so more recent
    /// residuals dominate the fit).
    fn fit_line(&self) -> (f64, f64) {
        let n = self.hist.len();
        let mut sw = 0.0;
        let mut swx = 0.0;
        let mut swy = 0.0;
        let mut swxx = 0.0;
        let mut swxy = 0.0;
        for (i, &(x, y)) in self.hist.iter().enumerate() {
            let w = (i as f64 + 1.0) * (1.0 - y.abs()).powi(2);
            sw += w;
            swx += w * x;
            swy += w * y;
            swxx += w * x * x;
            swxy += w * x * y;
        }
        let det = sw * swxx - swx * swx;
        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }
        let a = (sw * swxy - swx * swy) / det;
        let b = (swxx * swy - swx * swxy) / det;
        let _ = n;
        (a, b)
    }
}

impl DelayStrategy for BisectionStrategy {
    fn add_case(&mut self, timestamp: f64, fingerprint: &HtmlResult) {
        if let Some((ts0, res0)) = &self.last {
            let x = timestamp - ts0;
            let y = fingerprint.similarity(res0) - self.target;
            self.hist.push((x, y));
        }
        self.last = Some((timestamp, fingerprint.clone()));
    }

    fn get_delay(&mut self) -> f64 {
        if self.hist.len() < 2 {
            return self.default_delay;
        }
        let (a, b) = self.fit_line();
        if !(b >= self.target) || a >= 0.0 {
            let (x, y) = *self.hist.last().unwrap();
            return x * (1.0 + 1.0 / (1.0 - self.target)).powf(y);
        }
        (self.target - b) / a
    }
}
