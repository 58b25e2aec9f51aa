mod average;
mod bisection;
mod constant;
mod reciprocal;
mod simple;

pub use average::AverageStrategy;
pub use bisection::BisectionStrategy;
pub use constant::ConstantStrategy;
pub use reciprocal::ReciprocalStrategy;
pub use simple::SimpleStrategy;

use std::str::FromStr;

use crate::error::HarvestError;
use crate::fingerprint::HtmlResult;

/// Capability set shared by all delay-estimation strategies: one instance
/// per URL, mutated only by the fetch task that owns that URL.
pub trait DelayStrategy: Send {
    /// Records an observation. Must be called before `get_delay` at least
    /// once per fetch-task iteration.
    fn add_case(&mut self, timestamp: f64, fingerprint: &HtmlResult);

    /// Returns the next delay estimate in seconds, unclamped — clamping is
    /// the scheduler's job, not the strategy's.
    fn get_delay(&mut self) -> f64;
}

/// Registry tag selecting which `DelayStrategy` implementation backs a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Constant,
    Simple,
    Bisection,
    Reciprocal,
    Average,
}

impl FromStr for StrategyKind {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(StrategyKind::Constant),
            "simple" => Ok(StrategyKind::Simple),
            "bisection" => Ok(StrategyKind::Bisection),
            "reciprocal" => Ok(StrategyKind::Reciprocal),
            "average" => Ok(StrategyKind::Average),
            other => Err(HarvestError::InvalidConfig(format!(
                "unknown strategy selector: {other}"
            ))),
        }
    }
}

impl StrategyKind {
    /// Builds a fresh strategy instance, validating `0 < target < 1` for
    /// every variant except `Constant` (which hardcodes its own target
    /// internally and ignores the caller-supplied one).
    pub fn build(
        self,
        default_delay: f64,
        target: f64,
    ) -> Result<Box<dyn DelayStrategy>, HarvestError> {
        if self != StrategyKind::Constant && !(target > 0.0 && target < 1.0) {
            return Err(HarvestError::InvalidConfig(format!(
                "target must be in (0,1), got {target}"
            )));
        }
        if !(default_delay > 0.0) {
            return Err(HarvestError::InvalidConfig(format!(
                "default_delay must be positive, got {default_delay}"
            )));
        }
        Ok(match self {
            StrategyKind::Constant => Box::new(ConstantStrategy::new(default_delay)),
            StrategyKind::Simple => Box::new(SimpleStrategy::new(default_delay, target)),
            StrategyKind::Bisection => Box::new(BisectionStrategy::new(default_delay, target)),
            StrategyKind::Reciprocal => Box::new(ReciprocalStrategy::new(default_delay, target)),
            StrategyKind::Average => Box::new(AverageStrategy::new(default_delay, target, 0.8)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_target() {
        let err = StrategyKind::Simple.build(3600.0, 0.0).unwrap_err();
        assert!(matches!(err, HarvestError::InvalidConfig(_)));
        let err = StrategyKind::Simple.build(3600.0, 1.0).unwrap_err();
        assert!(matches!(err, HarvestError::InvalidConfig(_)));
    }

    #[test]
    fn constant_ignores_bad_target() {
        assert!(StrategyKind::Constant.build(3600.0, 5.0).is_ok());
    }

    #[test]
    fn parses_selector_strings() {
        assert_eq!("constant".parse::<StrategyKind>().unwrap(), StrategyKind::Constant);
        assert_eq!("Average".parse::<StrategyKind>().unwrap(), StrategyKind::Average);
        assert!("bogus".parse::<StrategyKind>().is_err());
    }
}
