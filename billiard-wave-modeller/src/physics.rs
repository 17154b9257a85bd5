//! Physical constants of a run, fixed at construction.
//!
//! The Courant number is `c·dt/dx`; the physical damping is `damping/dt²`.
//! Larger Courant numbers run faster but lose accuracy, and past the CFL
//! limit (`1/sqrt(2)` in 2D) the explicit scheme grows without bound.
//! That growth is not detected: only [`Clamp`] hides it.

use crate::error::{ConfigError, Result};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Which equation the field obeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Real displacement at two time levels: `phi` now, `psi` one step before.
    #[default]
    Wave,
    /// Complex wavefunction at one time level: `phi` real, `psi` imaginary.
    Schrodinger,
}

/// Lattice axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// How a missing neighbour across a grid edge is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTreatment {
    /// Reuse the edge cell itself (zero-flux wall).
    Clamp,
    /// Use the cell on the opposite edge.
    Wrap,
    /// One-sided decay towards the inward neighbour.
    Absorb,
}

/// Boundary-condition policy; exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryPolicy {
    #[default]
    Dirichlet,
    Periodic,
    Absorbing,
    /// Periodic along y, absorbing on the left and right edges.
    VerticalPeriodic,
    /// Periodic along x, absorbing on the top and bottom edges.
    HorizontalPeriodic,
}

impl BoundaryPolicy {
    /// Treatment of the two edges normal to `axis`.
    pub fn treatment(self, axis: Axis) -> EdgeTreatment {
        use BoundaryPolicy::*;
        match (self, axis) {
            (Dirichlet, _) => EdgeTreatment::Clamp,
            (Periodic, _) => EdgeTreatment::Wrap,
            (Absorbing, _) => EdgeTreatment::Absorb,
            (VerticalPeriodic, Axis::X) => EdgeTreatment::Absorb,
            (VerticalPeriodic, Axis::Y) => EdgeTreatment::Wrap,
            (HorizontalPeriodic, Axis::X) => EdgeTreatment::Wrap,
            (HorizontalPeriodic, Axis::Y) => EdgeTreatment::Absorb,
        }
    }
}

/// Stiffness and damping applied by the absorbing edge rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeCoefficients {
    #[serde(default)]
    pub stiffness: f64,
    #[serde(default)]
    pub damping: f64,
}

/// Absorbing-edge coefficients for the left/right sides and the top/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsorbingEdges {
    #[serde(default = "default_sides")]
    pub sides: EdgeCoefficients,
    #[serde(default = "default_top_bottom")]
    pub top_bottom: EdgeCoefficients,
}

fn default_sides() -> EdgeCoefficients {
    EdgeCoefficients {
        stiffness: 5.0e-4,
        damping: 1.0e-4,
    }
}

fn default_top_bottom() -> EdgeCoefficients {
    EdgeCoefficients {
        stiffness: 0.0,
        damping: 1.0e-7,
    }
}

impl Default for AbsorbingEdges {
    fn default() -> Self {
        Self {
            sides: default_sides(),
            top_bottom: default_top_bottom(),
        }
    }
}

/// Time increment and reduced Planck constant of the Schrödinger variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumStep {
    pub dt: f64,
    #[serde(default = "default_hbar")]
    pub hbar: f64,
}

fn default_hbar() -> f64 {
    1.0
}

impl Default for QuantumStep {
    fn default() -> Self {
        Self {
            dt: 1.0e-8,
            hbar: default_hbar(),
        }
    }
}

impl QuantumStep {
    /// Bulk integration step `dt / (dx²·hbar)`.
    pub fn bulk_step(&self, grid: &Grid) -> f64 {
        let dx = grid.dx();
        self.dt / (dx * dx * self.hbar)
    }

    /// Absorbing-edge step `dt / (dx·hbar)`.
    pub fn edge_step(&self, grid: &Grid) -> f64 {
        self.dt / (grid.dx() * self.hbar)
    }
}

/// Debug clamp of both buffers to `[-vmax, vmax]` after every update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clamp {
    pub vmax: f64,
}

/// Harmonic forcing of the left column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub amplitude: f64,
    /// Angular frequency per micro-step.
    pub omega: f64,
}

impl Oscillation {
    pub fn value_at(&self, step: u64) -> f64 {
        self.amplitude * (step as f64 * self.omega).cos()
    }
}

/// Immutable physical configuration handed to the coefficient builder and the stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParams {
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
    /// Courant number of medium A.
    #[serde(default = "default_courant")]
    pub courant: f64,
    /// Courant number of medium B (heterogeneous mode only).
    #[serde(default = "default_courant_b")]
    pub courant_b: f64,
    #[serde(default)]
    pub damping: f64,
    #[serde(default = "default_damping_b")]
    pub damping_b: f64,
    /// Global "elasticity" term pulling the field back towards zero.
    #[serde(default)]
    pub stiffness: f64,
    /// Replace the hard billiard wall by a second medium filling the outside.
    #[serde(default)]
    pub two_speeds: bool,
    #[serde(default)]
    pub edges: AbsorbingEdges,
    #[serde(default)]
    pub quantum: QuantumStep,
    #[serde(default)]
    pub clamp: Option<Clamp>,
    #[serde(default)]
    pub oscillate_left: Option<Oscillation>,
}

fn default_courant() -> f64 {
    0.06
}

fn default_courant_b() -> f64 {
    0.03
}

fn default_damping_b() -> f64 {
    1.0e-7
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            variant: Variant::Wave,
            boundary: BoundaryPolicy::Dirichlet,
            courant: default_courant(),
            courant_b: default_courant_b(),
            damping: 0.0,
            damping_b: default_damping_b(),
            stiffness: 0.0,
            two_speeds: false,
            edges: AbsorbingEdges::default(),
            quantum: QuantumStep::default(),
            clamp: None,
            oscillate_left: None,
        }
    }
}

impl PhysicsParams {
    pub fn wave(courant: f64) -> Self {
        Self {
            courant,
            ..Self::default()
        }
    }

    pub fn schrodinger(dt: f64, hbar: f64) -> Self {
        Self {
            variant: Variant::Schrodinger,
            quantum: QuantumStep { dt, hbar },
            ..Self::default()
        }
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_two_speeds(mut self, courant_b: f64, damping_b: f64) -> Self {
        self.two_speeds = true;
        self.courant_b = courant_b;
        self.damping_b = damping_b;
        self
    }

    pub fn with_clamp(mut self, vmax: f64) -> Self {
        self.clamp = Some(Clamp { vmax });
        self
    }

    /// Reject inconsistent settings before any stepping occurs.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("damping", self.damping),
            ("damping_b", self.damping_b),
            ("stiffness", self.stiffness),
            ("edges.sides.stiffness", self.edges.sides.stiffness),
            ("edges.sides.damping", self.edges.sides.damping),
            ("edges.top_bottom.stiffness", self.edges.top_bottom.stiffness),
            ("edges.top_bottom.damping", self.edges.top_bottom.damping),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        match self.variant {
            Variant::Wave => {
                if !(self.courant > 0.0) {
                    return Err(ConfigError::InvalidParameter(format!(
                        "courant must be positive, got {}",
                        self.courant
                    )));
                }
                if self.two_speeds && !(self.courant_b > 0.0) {
                    return Err(ConfigError::InvalidParameter(format!(
                        "courant_b must be positive in two-speed mode, got {}",
                        self.courant_b
                    )));
                }
            }
            Variant::Schrodinger => {
                if !(self.quantum.dt > 0.0) || !(self.quantum.hbar > 0.0) {
                    return Err(ConfigError::InvalidParameter(format!(
                        "quantum dt and hbar must be positive (dt={}, hbar={})",
                        self.quantum.dt, self.quantum.hbar
                    )));
                }
                if self.two_speeds {
                    return Err(ConfigError::Incompatible(
                        "two-speed media are only defined for the wave variant".to_string(),
                    ));
                }
                if self.oscillate_left.is_some() {
                    return Err(ConfigError::Incompatible(
                        "an oscillating left boundary is only defined for the wave variant"
                            .to_string(),
                    ));
                }
            }
        }

        // Medium B must not wrap onto itself across both pairs of edges.
        if self.two_speeds && self.boundary == BoundaryPolicy::Periodic {
            return Err(ConfigError::Incompatible(
                "two-speed media require a non-periodic boundary on at least one axis"
                    .to_string(),
            ));
        }

        if self.oscillate_left.is_some() && self.boundary.treatment(Axis::X) == EdgeTreatment::Wrap
        {
            return Err(ConfigError::Incompatible(format!(
                "an oscillating left boundary cannot be combined with the {:?} policy, which wraps the x axis",
                self.boundary
            )));
        }

        if let Some(drive) = self.oscillate_left {
            if !drive.amplitude.is_finite() || !drive.omega.is_finite() {
                return Err(ConfigError::InvalidParameter(format!(
                    "oscillation amplitude and omega must be finite (amplitude={}, omega={})",
                    drive.amplitude, drive.omega
                )));
            }
        }

        if let Some(clamp) = self.clamp {
            if !(clamp.vmax > 0.0) {
                return Err(ConfigError::InvalidParameter(format!(
                    "clamp vmax must be positive, got {}",
                    clamp.vmax
                )));
            }
        }

        Ok(())
    }
}
