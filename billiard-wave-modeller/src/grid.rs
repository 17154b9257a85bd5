use crate::error::{ConfigError, Result};

/// Fixed lattice laid over a physical rectangle.
///
/// Cell `(i, j)` sits at `(xmin + i·dx, ymin + j·dy)` with `dx = (xmax - xmin) / nx`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of cells along x
    pub ny: usize, // Number of cells along y
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Grid {
    /// Smallest lattice on which every edge cell still has an interior neighbour.
    pub const MIN_CELLS: usize = 3;

    pub fn new(nx: usize, ny: usize, xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self> {
        if nx < Self::MIN_CELLS || ny < Self::MIN_CELLS {
            return Err(ConfigError::InvalidGrid(format!(
                "lattice must be at least {min}x{min} cells, got {nx}x{ny}",
                min = Self::MIN_CELLS
            )));
        }
        if !(xmax > xmin) || !(ymax > ymin) {
            return Err(ConfigError::InvalidGrid(format!(
                "extent must be non-empty (x: [{xmin}, {xmax}], y: [{ymin}, {ymax}])"
            )));
        }
        Ok(Grid {
            nx,
            ny,
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Lattice spacing along x.
    pub fn dx(&self) -> f64 {
        (self.xmax - self.xmin) / self.nx as f64
    }

    /// Lattice spacing along y.
    pub fn dy(&self) -> f64 {
        (self.ymax - self.ymin) / self.ny as f64
    }

    /// Courant numbers assume `dx == dy`.
    pub fn has_square_cells(&self) -> bool {
        (self.dx() - self.dy()).abs() <= 1e-9 * self.dx()
    }

    pub fn contains_coord(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn index_to_coord(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.xmin + self.dx() * i as f64,
            self.ymin + self.dy() * j as f64,
        )
    }

    /// Nearest cell to `(x, y)`. Coordinates past the extent snap to the edge cells.
    pub fn coord_to_index(&self, x: f64, y: f64) -> (usize, usize) {
        let snap = |value: f64, min: f64, step: f64, n: usize| -> usize {
            let k = ((value - min) / step).round();
            if k <= 0.0 {
                0
            } else {
                (k as usize).min(n - 1)
            }
        };
        (
            snap(x, self.xmin, self.dx(), self.nx),
            snap(y, self.ymin, self.dy(), self.ny),
        )
    }

    /// Iterate every `(i, j)` in row-major order.
    pub fn indices(&self) -> impl Iterator<Item = (usize, usize)> {
        let ny = self.ny;
        (0..self.nx).flat_map(move |i| (0..ny).map(move |j| (i, j)))
    }
}
