use crate::domain::{DomainMask, Region};
use crate::physics::PhysicsParams;
use ndarray::Array2;

/// Per-cell coefficients of the wave recurrence.
pub struct CoefficientFields {
    pub courant: Array2<f64>, // Propagation speed c·dt/dx, used by absorbing edges
    pub courant2: Array2<f64>, // Squared Courant number, used by the leapfrog
    pub damping: Array2<f64>,
}

impl CoefficientFields {
    pub fn new(mask: &DomainMask, params: &PhysicsParams) -> Self {
        let (nx, ny) = mask.shape();

        let mut courant = Array2::<f64>::zeros((nx, ny));
        let mut courant2 = Array2::<f64>::zeros((nx, ny));
        let mut damping = Array2::<f64>::zeros((nx, ny));

        for i in 0..nx {
            for j in 0..ny {
                let (c, gamma) = match mask.region(i, j) {
                    Region::Primary => (params.courant, params.damping),
                    Region::Secondary if params.two_speeds => (params.courant_b, params.damping_b),
                    Region::Secondary => (params.courant, params.damping_b),
                    // Read by the stencil only when medium B fills the outside
                    Region::Outside if params.two_speeds => (params.courant_b, params.damping_b),
                    Region::Outside => (0.0, 0.0),
                };
                courant[[i, j]] = c;
                courant2[[i, j]] = c * c;
                damping[[i, j]] = gamma;
            }
        }

        Self {
            courant,
            courant2,
            damping,
        }
    }

    /// Largest Courant number anywhere on the lattice.
    pub fn max_courant(&self) -> f64 {
        self.courant.iter().copied().fold(0.0_f64, f64::max)
    }

    /// CFL check for the 2D five-point stencil: `c ≤ 1/sqrt(2)` everywhere.
    pub fn is_stable(&self) -> bool {
        self.max_courant() <= std::f64::consts::FRAC_1_SQRT_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn split_mask() -> DomainMask {
        // Left column outside, middle column primary, right column secondary
        let cells = Array2::from_shape_fn((3, 4), |(i, _)| match i {
            0 => Region::Outside,
            1 => Region::Primary,
            _ => Region::Secondary,
        });
        DomainMask::from_cells(cells)
    }

    #[test]
    fn test_single_medium() {
        let params = PhysicsParams::wave(0.06).with_damping(1e-6);
        let fields = CoefficientFields::new(&split_mask(), &params);

        assert_eq!(fields.courant[[1, 0]], 0.06);
        assert!((fields.courant2[[1, 2]] - 0.0036).abs() < 1e-15);
        assert_eq!(fields.damping[[1, 3]], 1e-6);

        // Secondary keeps the base speed but takes the alternate damping
        assert_eq!(fields.courant[[2, 0]], 0.06);
        assert_eq!(fields.damping[[2, 0]], params.damping_b);

        assert_eq!(fields.courant[[0, 0]], 0.0);
        assert_eq!(fields.courant2[[0, 0]], 0.0);
        assert_eq!(fields.damping[[0, 0]], 0.0);
    }

    #[test]
    fn test_two_speeds_fills_outside() {
        let params = PhysicsParams::wave(0.06).with_two_speeds(0.03, 1e-7);
        let fields = CoefficientFields::new(&split_mask(), &params);

        assert_eq!(fields.courant[[0, 1]], 0.03);
        assert!((fields.courant2[[0, 1]] - 0.0009).abs() < 1e-15);
        assert_eq!(fields.damping[[0, 1]], 1e-7);
        assert_eq!(fields.courant[[2, 1]], 0.03);
        assert_eq!(fields.courant[[1, 1]], 0.06);
    }

    #[test]
    fn test_stability_check() {
        let grid = Grid::new(8, 8, 0.0, 1.0, 0.0, 1.0).unwrap();
        let mask = DomainMask::full(&grid);
        assert!(CoefficientFields::new(&mask, &PhysicsParams::wave(0.5)).is_stable());
        assert!(!CoefficientFields::new(&mask, &PhysicsParams::wave(0.9)).is_stable());
    }
}
