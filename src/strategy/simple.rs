use crate::fingerprint::HtmlResult;
use crate::strategy::DelayStrategy;

/// Last-pair multiplicative correction. Returns `default_delay` only when
/// no prior pair exists yet; once two observations are available it always
/// applies the multiplicative correction.
pub struct SimpleStrategy {
    default_delay: f64,
    target: f64,
    last: Option<(f64, HtmlResult)>,
    current: Option<(f64, HtmlResult)>,
}

impl SimpleStrategy {
    pub fn new(default_delay: f64, target: f64) -> Self {
        Self {
            default_delay,
            target,
            last: None,
            current: None,
        }
    }
}

impl DelayStrategy for SimpleStrategy {
    fn add_case(&mut self, timestamp: f64, fingerprint: &HtmlResult) {
        self.last = self.current.take();
        self.current = Some((timestamp, fingerprint.clone()));
    }

    fn get_delay(&mut self) -> f64 {
        let (last, current) = match (&self.last, &self.current) {
            (Some(last), Some(current)) => (last, current),
            _ => return self.default_delay,
        };
        let (ts0, res0) = last;
        let (ts1, res1) = current;
        let cur_delay = ts1 - ts0;
        let sim = res0.similarity(res1);
        cur_delay * (1.0 + 1.0 / (1.0 - self.target)).powf(sim - self.target)
    }
}
