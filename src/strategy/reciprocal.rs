use crate::fingerprint::HtmlResult;
use crate::strategy::DelayStrategy;

/// Models similarity vs. elapsed seconds as `f(x) = (1-a)*b/(x+b) + a`
/// (`a ∈ [0,T)`, `b > 0`); `f(0)=1`, `f(x) → a` as `x → ∞`, strictly
/// decreasing. Closed-form solutions handle 0/1/2 samples; a bounded
/// Gauss-Newton refit handles ≥2 samples when the closed form is degenerate.
pub struct ReciprocalStrategy {
    default_delay: f64,
    target: f64,
    hist: Vec<(f64, f64)>,
    last: Option<(f64, HtmlResult)>,
}

fn reciprocal_func(x: f64, a: f64, b: f64) -> f64 {
    (1.0 - a) * b / (x + b) + a
}

/// Exact solution of the 2-point system `f(x0)=y0, f(x1)=y1`. Returns
/// `(NaN, NaN)` when both equations would require dividing by zero.
fn solve_exact(x0: f64, y0: f64, x1: f64, y1: f64) -> (f64, f64) {
    let denom = x0 * (y1 - 1.0) - x1 * (y0 - 1.0);
    if denom == 0.0 {
        (f64::NAN, f64::NAN)
    } else {
        let a = (x0 * y0 * (y1 - 1.0) - x1 * y1 * (y0 - 1.0)) / denom;
        let b = (x0 * x1 * (y0 - y1)) / denom;
        (a, b)
    }
}

/// Weighted non-linear refit over the full history. Weights descend from
/// `1/n` (oldest point) to `1` (most recent), so the most recent
/// observation carries the most weight. Bounded Gauss-Newton, projected
/// into `a ∈ [0, a_bound]`, `b > 0` after every step.
fn solve_fit(hist: &[(f64, f64)], target: f64) -> (f64, f64) {
    let n = hist.len();
    let tot: f64 = hist.iter().map(|&(_, y)| y).sum();
    if tot == 0.0 || tot == n as f64 {
        return (f64::NAN, f64::NAN);
    }

    let weights: Vec<f64> = (1..=n)
        .rev()
        .map(|sigma_rank| 1.0 / (sigma_rank as f64))
        .collect();
    let a_bound = target * n as f64 / (n as f64 + 1.0);

    let mut a = 0.0_f64;
    let mut b = 1.0_f64;

    for _ in 0..100 {
        let mut jtj = [[0.0_f64; 2]; 2];
        let mut jtr = [0.0_f64; 2];
        for (i, &(x, y)) in hist.iter().enumerate() {
            let w = weights[i];
            let denom = x + b;
            if denom.abs() < 1e-9 {
                continue;
            }
            let f = reciprocal_func(x, a, b);
            let r = f - y;
            let dfa = x / denom;
            let dfb = (1.0 - a) * x / (denom * denom);
            jtj[0][0] += w * dfa * dfa;
            jtj[0][1] += w * dfa * dfb;
            jtj[1][0] += w * dfa * dfb;
            jtj[1][1] += w * dfb * dfb;
            jtr[0] += w * dfa * r;
            jtr[1] += w * dfb * r;
        }
        let det = jtj[0][0] * jtj[1][1] - jtj[0][1] * jtj[1][0];
        if det.abs() < 1e-15 {
            break;
        }
        let delta_a = (-jtj[1][1] * jtr[0] + jtj[0][1] * jtr[1]) / det;
        let delta_b = (jtj[1][0] * jtr[0] - jtj[0][0] * jtr[1]) / det;

        a = (a + delta_a).clamp(0.0, a_bound);
        b = (b + delta_b).max(1e-9);

        if delta_a.abs() < 1e-10 && delta_b.abs() < 1e-10 {
            break;
        }
    }

    (a, b)
}

impl ReciprocalStrategy {
    pub fn new(default_delay: f64, target: f64) -> Self {
        Self {
            default_delay,
            target,
            hist: Vec::new(),
            last: None,
        }
    }

    fn is_valid(&self, a: f64, b: f64) -> bool {
        b > 0.0 && a >= 0.0 && a < self.target
    }
}

impl DelayStrategy for ReciprocalStrategy {
    fn add_case(&mut self, timestamp: f64, fingerprint: &HtmlResult) {
        if let Some((ts0, res0)) = &self.last {
            self.hist.push((timestamp - ts0, fingerprint.similarity(res0)));
        }
        self.last = Some((timestamp, fingerprint.clone()));
    }

    fn get_delay(&mut self) -> f64 {
        if self.hist.is_empty() {
            return self.default_delay;
        }

        let (a, b) = if self.hist.len() == 1 {
            let (x, y) = self.hist[0];
            let a = 0.0;
            let b = if y < 1.0 { x * y / (1.0 - y) } else { 0.0 };
            (a, b)
        } else {
            let (mut a, mut b) = if self.hist.len() == 2 {
                let (x0, y0) = self.hist[0];
                let (x1, y1) = self.hist[1];
                solve_exact(x0, y0, x1, y1)
            } else {
                (self.target, -1.0)
            };
            if !self.is_valid(a, b) {
                let fit = solve_fit(&self.hist, self.target);
                a = fit.0;
                b = fit.1;
            }
            (a, b)
        };

        if !self.is_valid(a, b) {
            let (x, y) = *self.hist.last().unwrap();
            return x * (1.0 + 1.0 / (1.0 - self.target)).powf(y - self.target);
        }

        b * (1.0 - self.target) / (self.target - a)
    }
}
