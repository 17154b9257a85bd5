//! Per-cell classification of the lattice against a billiard shape.

use crate::grid::Grid;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Region a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    /// Not simulated and not rendered.
    #[default]
    Outside,
    /// Medium A, the billiard interior.
    Primary,
    /// Medium B: a secondary or absorbing material.
    Secondary,
}

impl Region {
    pub fn is_inside(self) -> bool {
        self != Region::Outside
    }
}

/// Membership predicate supplied by the geometry collaborator.
///
/// Must be deterministic: the mask is built from a single evaluation per cell.
pub trait DomainShape {
    fn region(&self, x: f64, y: f64) -> Region;
}

impl<F> DomainShape for F
where
    F: Fn(f64, f64) -> Region,
{
    fn region(&self, x: f64, y: f64) -> Region {
        self(x, y)
    }
}

/// Region tag for every cell, built once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DomainMask {
    cells: Array2<Region>,
    inside: usize,
}

impl DomainMask {
    /// Evaluate `shape` once at every cell's physical coordinate.
    pub fn build(grid: &Grid, shape: &impl DomainShape) -> Self {
        let cells = Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let (x, y) = grid.index_to_coord(i, j);
            shape.region(x, y)
        });
        Self::from_cells(cells)
    }

    /// Every cell is primary medium.
    pub fn full(grid: &Grid) -> Self {
        Self::from_cells(Array2::from_elem(grid.shape(), Region::Primary))
    }

    pub fn from_cells(cells: Array2<Region>) -> Self {
        let inside = cells.iter().filter(|r| r.is_inside()).count();
        DomainMask { cells, inside }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn region(&self, i: usize, j: usize) -> Region {
        self.cells[[i, j]]
    }

    pub fn is_inside(&self, i: usize, j: usize) -> bool {
        self.cells[[i, j]].is_inside()
    }

    /// Number of cells that belong to the simulated domain.
    pub fn inside_count(&self) -> usize {
        self.inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_closure() {
        let grid = Grid::new(40, 40, -1.0, 1.0, -1.0, 1.0).unwrap();
        let disc = |x: f64, y: f64| {
            if x * x + y * y < 0.25 {
                Region::Primary
            } else {
                Region::Outside
            }
        };
        let mask = DomainMask::build(&grid, &disc);

        assert!(mask.is_inside(20, 20));
        assert!(!mask.is_inside(0, 0));
        // Area of the disc is pi/4 of a unit square, i.e. ~pi/16 of the grid
        let fraction = mask.inside_count() as f64 / (grid.nx * grid.ny) as f64;
        assert!((fraction - std::f64::consts::PI / 16.0).abs() < 0.02);
    }

    #[test]
    fn test_region_membership() {
        assert!(!Region::Outside.is_inside());
        assert!(Region::Secondary.is_inside());
    }

    #[test]
    fn test_full_mask() {
        let grid = Grid::new(5, 7, 0.0, 1.0, 0.0, 1.0).unwrap();
        let mask = DomainMask::full(&grid);
        assert_eq!(mask.inside_count(), 35);
        assert_eq!(mask.shape(), (5, 7));
    }
}
