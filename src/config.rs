use std::path::PathBuf;

use crate::error::HarvestError;
use crate::strategy::StrategyKind;

/// File-based config with a JSON-field → env-var → hard-default resolution
/// order. Every field is optional here; CLI flags parsed in `main` take
/// priority over whatever `resolve_*` returns.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct HarvestConfig {
    pub default_delay: Option<f64>,
    pub worker_count: Option<usize>,
    pub target: Option<f64>,
    pub strategy: Option<String>,
    pub output: Option<String>,
    pub lower_clamp: Option<f64>,
    pub upper_clamp: Option<f64>,
}

impl HarvestConfig {
    /// Default delay in seconds: JSON field → `HARVEST_DEFAULT_DELAY` env var → 3600.
    pub fn resolve_default_delay(&self) -> f64 {
        if let Some(d) = self.default_delay {
            return d;
        }
        std::env::var("HARVEST_DEFAULT_DELAY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600.0)
    }

    /// Worker pool size: JSON field → `HARVEST_WORKER_COUNT` env var →
    /// `std::thread::available_parallelism()`.
    pub fn resolve_worker_count(&self) -> usize {
        if let Some(n) = self.worker_count {
            return n;
        }
        std::env::var("HARVEST_WORKER_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
    }

    /// Target similarity: JSON field → `HARVEST_TARGET` env var → 0.8.
    pub fn resolve_target(&self) -> f64 {
        if let Some(t) = self.target {
            return t;
        }
        std::env::var("HARVEST_TARGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.8)
    }

    /// Strategy selector: JSON field → `HARVEST_STRATEGY` env var → `"constant"`.
    pub fn resolve_strategy(&self) -> Result<StrategyKind, HarvestError> {
        let raw = self
            .strategy
            .clone()
            .or_else(|| std::env::var("HARVEST_STRATEGY").ok())
            .unwrap_or_else(|| "constant".to_string());
        raw.parse()
    }

    /// Output base name: JSON field → `HARVEST_OUTPUT` env var → `"harvest"`.
    pub fn resolve_output(&self) -> String {
        if let Some(o) = &self.output {
            if !o.trim().is_empty() {
                return o.clone();
            }
        }
        std::env::var("HARVEST_OUTPUT").unwrap_or_else(|_| "harvest".to_string())
    }

    /// Lower clamp in seconds: JSON field → `HARVEST_LOWER_CLAMP` env var → 60.
    pub fn resolve_lower_clamp(&self) -> f64 {
        if let Some(v) = self.lower_clamp {
            return v;
        }
        std::env::var("HARVEST_LOWER_CLAMP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60.0)
    }

    /// Upper clamp in seconds: JSON field → `HARVEST_UPPER_CLAMP` env var → 86400.
    pub fn resolve_upper_clamp(&self) -> f64 {
        if let Some(v) = self.upper_clamp {
            return v;
        }
        std::env::var("HARVEST_UPPER_CLAMP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400.0)
    }
}

/// Load `harvest.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `./harvest.json`
/// 2. `../harvest.json`
/// 3. `HARVEST_CONFIG` env var path
///
/// Missing file → `HarvestConfig::default()` (silent, all env-var/CLI
/// fallbacks still apply). Parse error → log a warning, return default.
pub fn load_harvest_config() -> HarvestConfig {
    let candidates: Vec<PathBuf> = {
        let mut v = vec![
            PathBuf::from("harvest.json"),
            PathBuf::from("../harvest.json"),
        ];
        if let Ok(env_path) = std::env::var("HARVEST_CONFIG") {
            v.insert(0, PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                return match serde_json::from_str::<HarvestConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::info!("harvest.json loaded from {}", path.display());
                        cfg
                    }
                    Err(e) => {
                        tracing::warn!(
                            "harvest.json parse error at {}: {} — using defaults",
                            path.display(),
                            e
                        );
                        HarvestConfig::default()
                    }
                };
            }
            Err(_) => continue,
        }
    }

    HarvestConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.resolve_lower_clamp(), 60.0);
        assert_eq!(cfg.resolve_upper_clamp(), 86400.0);
        assert_eq!(cfg.resolve_output(), "harvest".to_string());
    }

    #[test]
    fn json_field_wins_over_default() {
        let cfg = HarvestConfig {
            default_delay: Some(120.0),
            target: Some(0.9),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_default_delay(), 120.0);
        assert_eq!(cfg.resolve_target(), 0.9);
    }
}
