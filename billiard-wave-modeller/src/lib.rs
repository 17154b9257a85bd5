//! Explicit finite-difference evolution of wave and Schrödinger fields on
//! billiard-shaped domains.
//!
//! A [`Simulation`] owns the lattice, the domain mask, the per-cell
//! coefficients and the field. Each [`Simulation::tick`] runs a number of
//! stencil sub-steps and hands back a [`Frame`] for the renderer.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod grid;
pub mod initial;
pub mod materials;
pub mod normalise;
pub mod physics;
pub mod simulation;
pub mod stencil;
pub mod wavefield;

pub use diagnostics::{DiagnosticsSink, MemoryLog, Probe, WriterLog};
pub use domain::{DomainMask, DomainShape, Region};
pub use error::{ConfigError, Result};
pub use grid::Grid;
pub use initial::{Packet, PulseParams, PulseStart, WavepacketParams};
pub use physics::{BoundaryPolicy, PhysicsParams, Variant};
pub use simulation::{Frame, RunParams, Simulation, Statistic};
pub use wavefield::FieldState;
