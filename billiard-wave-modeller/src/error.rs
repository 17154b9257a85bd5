//! Error types for the billiard engine.

use thiserror::Error;

/// Refusals raised while assembling a simulation, before any stepping happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),

    #[error("Probe at ({x}, {y}) lies outside the grid extent")]
    ProbeOutsideGrid { x: f64, y: f64 },

    #[error("Field shape {found:?} does not match grid shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
