use serde::Deserialize;

/// Tuning values for the analyzer and narrative generator. Deployments
/// override these through the layered config file / environment that the
/// server and CLI load; the pipeline never reads the environment itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Absolute delta (currency units) at or above which a row is Critical.
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
    /// Absolute delta at or above which a row is High.
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
    /// Absolute delta at or above which a row is Medium.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
    /// Percentage change below which a row counts as unchanged.
    #[serde(default = "default_minimal_change_pct")]
    pub minimal_change_pct: f64,
    /// Percentage change above which an increase is flagged as sharp.
    #[serde(default = "default_sharp_change_pct")]
    pub sharp_change_pct: f64,
    /// How many rows the driver view keeps.
    #[serde(default = "default_top_drivers")]
    pub top_drivers: usize,
    /// Dimension keys treated as tax and dropped by the normalizer.
    #[serde(default = "default_tax_keys")]
    pub tax_keys: Vec<String>,
    /// Usage-type shifts below this amount are left out of reason text.
    #[serde(default = "default_min_significant_cost")]
    pub min_significant_cost: f64,
}

fn default_critical_threshold() -> f64 {
    1000.0
}

fn default_high_threshold() -> f64 {
    500.0
}

fn default_medium_threshold() -> f64 {
    100.0
}

fn default_minimal_change_pct() -> f64 {
    5.0
}

fn default_sharp_change_pct() -> f64 {
    20.0
}

fn default_top_drivers() -> usize {
    5
}

fn default_tax_keys() -> Vec<String> {
    vec!["Tax".to_string()]
}

fn default_min_significant_cost() -> f64 {
    0.01
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_threshold: default_critical_threshold(),
            high_threshold: default_high_threshold(),
            medium_threshold: default_medium_threshold(),
            minimal_change_pct: default_minimal_change_pct(),
            sharp_change_pct: default_sharp_change_pct(),
            top_drivers: default_top_drivers(),
            tax_keys: default_tax_keys(),
            min_significant_cost: default_min_significant_cost(),
        }
    }
}

impl AnalysisConfig {
    /// Case-insensitive match against the configured tax key names.
    pub fn is_tax_key(&self, key: &str) -> bool {
        self.tax_keys.iter().any(|t| t.eq_ignore_ascii_case(key))
    }
}
