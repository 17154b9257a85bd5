//! Localized initial conditions.

use crate::domain::DomainMask;
use crate::error::{ConfigError, Result};
use crate::grid::Grid;
use crate::wavefield::FieldState;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Envelope floor of a coherent state, keeping its phase defined everywhere.
const ENVELOPE_FLOOR: f64 = 1.0e-15;

/// What the "previous" level of a classical pulse holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PulseStart {
    /// Previous level is zero: the pulse starts with a kick.
    #[default]
    Impulsive,
    /// Previous level equals the pulse: released from rest.
    Resting,
}

/// Damped radial cosine, `amplitude·exp(-r²/variance)·cos(-r/wavelength)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseParams {
    #[serde(default = "default_pulse_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_pulse_variance")]
    pub variance: f64,
    #[serde(default = "default_pulse_wavelength")]
    pub wavelength: f64,
    #[serde(default)]
    pub start: PulseStart,
}

fn default_pulse_amplitude() -> f64 {
    0.2
}

fn default_pulse_variance() -> f64 {
    0.001
}

fn default_pulse_wavelength() -> f64 {
    0.01
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            amplitude: default_pulse_amplitude(),
            variance: default_pulse_variance(),
            wavelength: default_pulse_wavelength(),
            start: PulseStart::Impulsive,
        }
    }
}

/// Gaussian envelope of width `scale` carrying momentum `(px, py)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavepacketParams {
    #[serde(default = "default_packet_amplitude")]
    pub amplitude: f64,
    pub scale: f64,
    #[serde(default)]
    pub px: f64,
    #[serde(default)]
    pub py: f64,
}

fn default_packet_amplitude() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Packet {
    Pulse(PulseParams),
    Wavepacket(WavepacketParams),
}

impl Packet {
    /// Widths and wavelengths must be positive for the profile to be finite.
    pub fn validate(&self) -> Result<()> {
        let (name, value) = match self {
            Packet::Pulse(p) if !(p.variance > 0.0) => ("variance", p.variance),
            Packet::Pulse(p) if !(p.wavelength > 0.0) => ("wavelength", p.wavelength),
            Packet::Wavepacket(w) if !(w.scale > 0.0) => ("scale", w.scale),
            _ => return Ok(()),
        };
        Err(ConfigError::InvalidParameter(format!(
            "packet {name} must be positive, got {value}"
        )))
    }

    /// Contribution to `(phi, psi)` at offset `(dx, dy)` from the packet centre.
    pub fn sample(&self, dx: f64, dy: f64) -> (f64, f64) {
        let dist2 = dx * dx + dy * dy;
        match self {
            Packet::Pulse(p) => {
                let value = p.amplitude
                    * (-dist2 / p.variance).exp()
                    * (-dist2.sqrt() / p.wavelength).cos();
                match p.start {
                    PulseStart::Impulsive => (value, 0.0),
                    PulseStart::Resting => (value, value),
                }
            }
            Packet::Wavepacket(w) => {
                let envelope = (-dist2 / (w.scale * w.scale)).exp().max(ENVELOPE_FLOOR);
                let phase = (w.px * dx + w.py * dy) / w.scale;
                (
                    w.amplitude * envelope * phase.cos(),
                    w.amplitude * envelope * phase.sin(),
                )
            }
        }
    }
}

/// Overwrite `state` with `packet` centred at `(x, y)`. Outside cells become zero.
pub fn seed_packet(
    state: &mut FieldState,
    grid: &Grid,
    mask: &DomainMask,
    x: f64,
    y: f64,
    packet: &Packet,
) {
    Zip::indexed(&mut state.phi)
        .and(&mut state.psi)
        .par_for_each(|(i, j), phi, psi| {
            if mask.is_inside(i, j) {
                let (cx, cy) = grid.index_to_coord(i, j);
                let (a, b) = packet.sample(cx - x, cy - y);
                *phi = a;
                *psi = b;
            } else {
                *phi = 0.0;
                *psi = 0.0;
            }
        });
}

/// Superimpose `factor × packet` centred at `(x, y)` onto the inside cells of `state`.
pub fn add_packet(
    state: &mut FieldState,
    grid: &Grid,
    mask: &DomainMask,
    factor: f64,
    x: f64,
    y: f64,
    packet: &Packet,
) {
    Zip::indexed(&mut state.phi)
        .and(&mut state.psi)
        .par_for_each(|(i, j), phi, psi| {
            if mask.is_inside(i, j) {
                let (cx, cy) = grid.index_to_coord(i, j);
                let (a, b) = packet.sample(cx - x, cy - y);
                *phi += factor * a;
                *psi += factor * b;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid {
        Grid::new(64, 64, -1.0, 1.0, -1.0, 1.0).unwrap()
    }

    fn half_mask(grid: &Grid) -> DomainMask {
        DomainMask::build(grid, &|x: f64, _y: f64| {
            if x < 0.25 {
                Region::Primary
            } else {
                Region::Outside
            }
        })
    }

    #[test]
    fn test_pulse_peak_and_previous_level() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let mut state = FieldState::new(64, 64);
        state.psi.fill(3.0);

        let packet = Packet::Pulse(PulseParams::default());
        let (i, j) = grid.coord_to_index(0.0, 0.0);
        let (x, y) = grid.index_to_coord(i, j);
        seed_packet(&mut state, &grid, &mask, x, y, &packet);

        assert_abs_diff_eq!(state.phi[[i, j]], 0.2, epsilon = 1e-15);
        assert!(state.psi.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_resting_pulse_duplicates_level() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let mut state = FieldState::new(64, 64);
        let packet = Packet::Pulse(PulseParams {
            start: PulseStart::Resting,
            ..PulseParams::default()
        });
        seed_packet(&mut state, &grid, &mask, 0.1, -0.2, &packet);
        assert_eq!(state.phi, state.psi);
    }

    #[test]
    fn test_wavepacket_phase() {
        let packet = Packet::Wavepacket(WavepacketParams {
            amplitude: 1.0,
            scale: 0.25,
            px: 40.0,
            py: 0.0,
        });
        let (re, im) = packet.sample(0.0, 0.0);
        assert_abs_diff_eq!(re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(im, 0.0, epsilon = 1e-15);

        let (re, im) = packet.sample(0.01, 0.0);
        let envelope = (-0.0001_f64 / 0.0625).exp();
        assert_abs_diff_eq!(re, envelope * 1.6_f64.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(im, envelope * 1.6_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_validate_rejects_degenerate_widths() {
        assert!(Packet::Pulse(PulseParams::default()).validate().is_ok());
        let flat = Packet::Pulse(PulseParams {
            variance: 0.0,
            ..PulseParams::default()
        });
        assert!(flat.validate().is_err());
        let packet = Packet::Wavepacket(WavepacketParams {
            amplitude: 1.0,
            scale: -0.1,
            px: 0.0,
            py: 0.0,
        });
        assert!(packet.validate().is_err());
    }

    #[test]
    fn test_envelope_floor() {
        let packet = Packet::Wavepacket(WavepacketParams {
            amplitude: 1.0,
            scale: 0.01,
            px: 0.0,
            py: 0.0,
        });
        let (re, _) = packet.sample(1.0, 1.0);
        assert_eq!(re, ENVELOPE_FLOOR);
    }

    #[test]
    fn test_seed_leaves_outside_zero() {
        let grid = grid();
        let mask = half_mask(&grid);
        let mut state = FieldState::new(64, 64);
        state.phi.fill(1.0);
        let packet = Packet::Wavepacket(WavepacketParams {
            amplitude: 1.0,
            scale: 2.0,
            px: 1.0,
            py: 1.0,
        });
        seed_packet(&mut state, &grid, &mask, 0.0, 0.0, &packet);

        for (i, j) in grid.indices() {
            if !mask.is_inside(i, j) {
                assert_eq!(state.at(i, j), (0.0, 0.0));
            }
        }
    }

    #[test]
    fn test_add_then_subtract_restores() {
        let grid = grid();
        let mask = half_mask(&grid);
        let mut state = FieldState::new(64, 64);
        let pulse = Packet::Pulse(PulseParams {
            variance: 0.05,
            wavelength: 0.1,
            ..PulseParams::default()
        });
        seed_packet(&mut state, &grid, &mask, -0.3, 0.1, &pulse);
        let before = state.clone();

        add_packet(&mut state, &grid, &mask, 1.0, 0.0, 0.0, &pulse);
        assert_ne!(state, before);
        add_packet(&mut state, &grid, &mask, -1.0, 0.0, 0.0, &pulse);

        for (a, b) in state.phi.iter().zip(before.phi.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-14);
        }
        assert_eq!(state.psi, before.psi);
    }
}
