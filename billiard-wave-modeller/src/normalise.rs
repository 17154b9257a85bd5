//! Aggregate statistics over the domain and display scaling.

use crate::domain::DomainMask;
use crate::materials::CoefficientFields;
use crate::physics::{Axis, BoundaryPolicy, Variant};
use crate::stencil::{laplacian, resolve};
use crate::wavefield::FieldState;
use ndarray::Zip;
use rayon::prelude::*;
use tracing::warn;

/// Mean squared magnitude over inside cells.
///
/// The wave variant counts `phi²` only, the Schrödinger variant `phi² + psi²`.
/// An empty domain counts as one cell.
pub fn compute_aggregate(state: &FieldState, mask: &DomainMask, variant: Variant) -> f64 {
    let (nx, ny) = state.shape();
    let sum: f64 = (0..nx)
        .into_par_iter()
        .map(|i| {
            (0..ny)
                .filter(|&j| mask.is_inside(i, j))
                .map(|j| {
                    let phi = state.phi[[i, j]];
                    match variant {
                        Variant::Wave => phi * phi,
                        Variant::Schrodinger => {
                            let psi = state.psi[[i, j]];
                            phi * phi + psi * psi
                        }
                    }
                })
                .sum::<f64>()
        })
        .sum();
    sum / mask.inside_count().max(1) as f64
}

/// Display scale `sqrt(1 + aggregate)` for the renderer.
pub fn derive_scale(aggregate: f64) -> f64 {
    (1.0 + aggregate).sqrt()
}

/// Divide every inside cell of a complex field by `sqrt(aggregate)`.
///
/// Afterwards the mean probability over the domain is one. A non-positive
/// aggregate leaves the field untouched.
pub fn renormalise(state: &mut FieldState, mask: &DomainMask, aggregate: f64) {
    if !(aggregate > 0.0) {
        warn!(aggregate, "Cannot renormalise a field with no probability mass");
        return;
    }
    let norm = aggregate.sqrt();
    Zip::indexed(&mut state.phi)
        .and(&mut state.psi)
        .par_for_each(|(i, j), phi, psi| {
            if mask.is_inside(i, j) {
                *phi /= norm;
                *psi /= norm;
            }
        });
}

/// Discrete energy of the leapfrog wave scheme,
/// `Σ (phi - psi)² - Σ phi·(c²·Δpsi - stiffness·psi)` over inside cells.
///
/// Conserved exactly by undamped steps on non-absorbing boundaries when the
/// Courant number is uniform.
pub fn wave_energy(
    state: &FieldState,
    mask: &DomainMask,
    coeffs: &CoefficientFields,
    policy: BoundaryPolicy,
    stiffness: f64,
) -> f64 {
    let (nx, ny) = state.shape();
    (0..nx)
        .into_par_iter()
        .map(|i| {
            let along_x = resolve(i, nx, policy.treatment(Axis::X));
            (0..ny)
                .filter(|&j| mask.is_inside(i, j))
                .map(|j| {
                    let along_y = resolve(j, ny, policy.treatment(Axis::Y));
                    let phi = state.phi[[i, j]];
                    let psi = state.psi[[i, j]];
                    let lap = laplacian(&state.psi, [i, j], along_x, along_y);
                    let kinetic = (phi - psi) * (phi - psi);
                    kinetic - phi * (coeffs.courant2[[i, j]] * lap - stiffness * psi)
                })
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;
    use crate::grid::Grid;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn grid() -> Grid {
        Grid::new(10, 10, 0.0, 1.0, 0.0, 1.0).unwrap()
    }

    #[test]
    fn test_wave_aggregate_ignores_psi() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let mut state = FieldState::new(10, 10);
        state.phi.fill(2.0);
        state.psi.fill(100.0);
        assert_relative_eq!(compute_aggregate(&state, &mask, Variant::Wave), 4.0);
        assert_relative_eq!(
            compute_aggregate(&state, &mask, Variant::Schrodinger),
            10004.0
        );
    }

    #[test]
    fn test_aggregate_only_counts_inside_cells() {
        let cells = Array2::from_shape_fn((10, 10), |(i, _)| {
            if i < 5 {
                Region::Primary
            } else {
                Region::Outside
            }
        });
        let mask = DomainMask::from_cells(cells);
        let mut state = FieldState::new(10, 10);
        for j in 0..10 {
            state.phi[[0, j]] = 1.0;
            state.phi[[9, j]] = 50.0;
        }
        // 10 unit cells out of 50 inside cells
        assert_relative_eq!(compute_aggregate(&state, &mask, Variant::Wave), 0.2);
    }

    #[test]
    fn test_empty_domain_does_not_divide_by_zero() {
        let mask = DomainMask::from_cells(Array2::from_elem((4, 4), Region::Outside));
        let mut state = FieldState::new(4, 4);
        state.phi.fill(1.0);
        assert_eq!(compute_aggregate(&state, &mask, Variant::Schrodinger), 0.0);
    }

    #[test]
    fn test_scale() {
        assert_eq!(derive_scale(0.0), 1.0);
        assert_relative_eq!(derive_scale(3.0), 2.0);
    }

    #[test]
    fn test_renormalise_gives_unit_probability() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let mut state = FieldState::new(10, 10);
        state.phi[[3, 4]] = 3.0;
        state.psi[[3, 4]] = 4.0;
        state.phi[[7, 1]] = -1.0;

        let aggregate = compute_aggregate(&state, &mask, Variant::Schrodinger);
        renormalise(&mut state, &mask, aggregate);
        assert_relative_eq!(
            compute_aggregate(&state, &mask, Variant::Schrodinger),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_renormalise_zero_field_is_noop() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let mut state = FieldState::new(10, 10);
        renormalise(&mut state, &mask, 0.0);
        assert!(state.phi.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_energy_of_static_field() {
        let grid = grid();
        let mask = DomainMask::full(&grid);
        let coeffs = CoefficientFields::new(&mask, &crate::physics::PhysicsParams::wave(0.5));
        let mut state = FieldState::new(10, 10);
        state.phi.fill(1.0);
        state.psi.fill(1.0);
        // A constant field has no gradient, so only stiffness contributes
        assert_relative_eq!(
            wave_energy(&state, &mask, &coeffs, BoundaryPolicy::Periodic, 0.0),
            0.0
        );
        assert_relative_eq!(
            wave_energy(&state, &mask, &coeffs, BoundaryPolicy::Periodic, 0.01),
            1.0,
            epsilon = 1e-12
        );
    }
}
