//! Month-over-month cost report construction: normalization of raw cost
//! records, delta analysis, narrative generation, and rendering to
//! spreadsheet or document artifacts.

pub mod analyze;
pub mod config;
pub mod error;
pub mod narrative;
pub mod normalize;
pub mod pipeline;
pub mod render;

pub use analyze::{analyze, drivers, ChangeClass, DeltaRow, ImpactTier, PctChange};
pub use config::AnalysisConfig;
pub use error::ReportError;
pub use normalize::{build_matrix, CostMatrix};
pub use pipeline::{build_report, comparison_periods, validate_request, MAX_PERIODS, MIN_PERIODS};
pub use render::{renderer_for, Renderer, ReportView};
