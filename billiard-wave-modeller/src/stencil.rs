//! Explicit five-point stencil update.
//!
//! A micro-step reads only from an input [`FieldState`] and writes every cell
//! of an output one exactly once:
//!
//! 1. interior cells, in parallel;
//! 2. the left, right, bottom and top edges, corners excluded, one
//!    parameterized pass per [`Edge`];
//! 3. the four corners, serially, with a dedicated rule.
//!
//! A corner touching an absorbing edge decays towards the mean of its inward
//! neighbours along the absorbing axes, with the side coefficients when the
//! left/right edge absorbs and the top/bottom ones otherwise. Any other corner
//! uses the bulk recurrence with clamped or wrapped neighbours.
//!
//! Cells that are not active (outside the mask, unless medium B fills the
//! outside) are copied through unchanged.

use crate::domain::DomainMask;
use crate::materials::CoefficientFields;
use crate::physics::{
    AbsorbingEdges, Axis, BoundaryPolicy, Clamp, EdgeCoefficients, EdgeTreatment, Oscillation,
    PhysicsParams, QuantumStep, Variant,
};
use crate::grid::Grid;
use crate::wavefield::FieldState;
use ndarray::{s, Array2, Zip};
use rayon::prelude::*;

/// Read-only view of one cell and its four resolved neighbours.
pub struct Stencil<'a> {
    field: &'a FieldState,
    coeffs: &'a CoefficientFields,
    centre: [usize; 2],
    along_x: [usize; 2], // (minus, plus) neighbour indices along x
    along_y: [usize; 2],
}

impl<'a> Stencil<'a> {
    fn new(
        field: &'a FieldState,
        coeffs: &'a CoefficientFields,
        (i, j): (usize, usize),
        along_x: [usize; 2],
        along_y: [usize; 2],
    ) -> Self {
        Stencil {
            field,
            coeffs,
            centre: [i, j],
            along_x,
            along_y,
        }
    }

    pub fn phi(&self) -> f64 {
        self.field.phi[self.centre]
    }

    pub fn psi(&self) -> f64 {
        self.field.psi[self.centre]
    }

    pub fn laplacian_phi(&self) -> f64 {
        laplacian(&self.field.phi, self.centre, self.along_x, self.along_y)
    }

    pub fn laplacian_psi(&self) -> f64 {
        laplacian(&self.field.psi, self.centre, self.along_x, self.along_y)
    }

    pub fn courant(&self) -> f64 {
        self.coeffs.courant[self.centre]
    }

    pub fn courant2(&self) -> f64 {
        self.coeffs.courant2[self.centre]
    }

    pub fn damping(&self) -> f64 {
        self.coeffs.damping[self.centre]
    }
}

/// Sum of the four axis neighbours minus four times the centre.
pub(crate) fn laplacian(
    a: &Array2<f64>,
    [i, j]: [usize; 2],
    [im, ip]: [usize; 2],
    [jm, jp]: [usize; 2],
) -> f64 {
    a[[im, j]] + a[[ip, j]] + a[[i, jm]] + a[[i, jp]] - 4.0 * a[[i, j]]
}

/// `(minus, plus)` neighbours of index `k` on an axis of length `n`.
///
/// Off-grid neighbours wrap for [`EdgeTreatment::Wrap`] and clamp onto `k`
/// otherwise, which turns the five-point sum into the three-point one.
pub(crate) fn resolve(k: usize, n: usize, treatment: EdgeTreatment) -> [usize; 2] {
    let wrap = treatment == EdgeTreatment::Wrap;
    let minus = match k {
        0 if wrap => n - 1,
        0 => 0,
        _ => k - 1,
    };
    let plus = if k + 1 == n {
        if wrap {
            0
        } else {
            n - 1
        }
    } else {
        k + 1
    };
    [minus, plus]
}

/// Per-cell recurrence plugged into the [`Stepper`].
pub trait UpdateRule: Send + Sync {
    /// Leapfrog update from the full neighbourhood.
    fn bulk(&self, cell: &Stencil) -> (f64, f64);

    /// One-sided update towards the inward neighbour `(phi, psi)` on an absorbing edge.
    fn absorbing(&self, cell: &Stencil, inward: (f64, f64), edge: EdgeCoefficients) -> (f64, f64);
}

/// Damped wave equation; `phi` is now, `psi` the previous level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveRule {
    pub stiffness: f64,
}

impl UpdateRule for WaveRule {
    fn bulk(&self, cell: &Stencil) -> (f64, f64) {
        let x = cell.phi();
        let y = cell.psi();
        let next = -y + 2.0 * x + cell.courant2() * cell.laplacian_phi()
            - self.stiffness * x
            - cell.damping() * (x - y);
        (next, x)
    }

    fn absorbing(&self, cell: &Stencil, inward: (f64, f64), edge: EdgeCoefficients) -> (f64, f64) {
        let x = cell.phi();
        let y = cell.psi();
        let next =
            x - cell.courant() * (x - inward.0) - edge.stiffness * x - edge.damping * (x - y);
        (next, x)
    }
}

/// Schrödinger equation as a rotation of the real and imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchrodingerRule {
    /// `dt / (dx²·hbar)`
    pub step: f64,
    /// `dt / (dx·hbar)`, used on absorbing edges
    pub edge_step: f64,
}

impl SchrodingerRule {
    pub fn new(quantum: &QuantumStep, grid: &Grid) -> Self {
        Self {
            step: quantum.bulk_step(grid),
            edge_step: quantum.edge_step(grid),
        }
    }
}

impl UpdateRule for SchrodingerRule {
    fn bulk(&self, cell: &Stencil) -> (f64, f64) {
        (
            cell.phi() - self.step * cell.laplacian_psi(),
            cell.psi() + self.step * cell.laplacian_phi(),
        )
    }

    fn absorbing(&self, cell: &Stencil, inward: (f64, f64), _edge: EdgeCoefficients) -> (f64, f64) {
        let x = cell.phi();
        let y = cell.psi();
        (
            x - self.edge_step * (y - inward.1),
            y + self.edge_step * (x - inward.0),
        )
    }
}

/// Either recurrence, chosen at run time from [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Wave(WaveRule),
    Schrodinger(SchrodingerRule),
}

impl Rule {
    pub fn for_params(params: &PhysicsParams, grid: &Grid) -> Self {
        match params.variant {
            Variant::Wave => Rule::Wave(WaveRule {
                stiffness: params.stiffness,
            }),
            Variant::Schrodinger => Rule::Schrodinger(SchrodingerRule::new(&params.quantum, grid)),
        }
    }
}

impl UpdateRule for Rule {
    fn bulk(&self, cell: &Stencil) -> (f64, f64) {
        match self {
            Rule::Wave(rule) => rule.bulk(cell),
            Rule::Schrodinger(rule) => rule.bulk(cell),
        }
    }

    fn absorbing(&self, cell: &Stencil, inward: (f64, f64), edge: EdgeCoefficients) -> (f64, f64) {
        match self {
            Rule::Wave(rule) => rule.absorbing(cell, inward, edge),
            Rule::Schrodinger(rule) => rule.absorbing(cell, inward, edge),
        }
    }
}

/// One side of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    /// Axis normal to the edge.
    pub fn axis(self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::X,
            Edge::Bottom | Edge::Top => Axis::Y,
        }
    }

    /// Cells along the edge, corners excluded.
    pub fn cells(self, nx: usize, ny: usize) -> Vec<(usize, usize)> {
        match self {
            Edge::Left => (1..ny - 1).map(|j| (0, j)).collect(),
            Edge::Right => (1..ny - 1).map(|j| (nx - 1, j)).collect(),
            Edge::Bottom => (1..nx - 1).map(|i| (i, 0)).collect(),
            Edge::Top => (1..nx - 1).map(|i| (i, ny - 1)).collect(),
        }
    }

    /// Neighbour one cell into the grid.
    pub fn inward(self, (i, j): (usize, usize)) -> (usize, usize) {
        match self {
            Edge::Left => (i + 1, j),
            Edge::Right => (i - 1, j),
            Edge::Bottom => (i, j + 1),
            Edge::Top => (i, j - 1),
        }
    }
}

/// Advances a [`FieldState`] with one [`UpdateRule`] under one [`BoundaryPolicy`].
#[derive(Debug, Clone)]
pub struct Stepper<R> {
    rule: R,
    policy: BoundaryPolicy,
    edges: AbsorbingEdges,
    /// Every cell is updated; set when medium B fills the outside.
    borderless: bool,
    clamp: Option<Clamp>,
    drive: Option<Oscillation>,
}

impl Stepper<Rule> {
    pub fn from_params(params: &PhysicsParams, grid: &Grid) -> Self {
        Stepper {
            rule: Rule::for_params(params, grid),
            policy: params.boundary,
            edges: params.edges,
            borderless: params.two_speeds,
            clamp: params.clamp,
            drive: params.oscillate_left,
        }
    }
}

impl<R: UpdateRule> Stepper<R> {
    pub fn new(rule: R, policy: BoundaryPolicy) -> Self {
        Stepper {
            rule,
            policy,
            edges: AbsorbingEdges::default(),
            borderless: false,
            clamp: None,
            drive: None,
        }
    }

    fn is_active(&self, mask: &DomainMask, i: usize, j: usize) -> bool {
        self.borderless || mask.is_inside(i, j)
    }

    fn clamped(&self, (phi, psi): (f64, f64)) -> (f64, f64) {
        match self.clamp {
            Some(Clamp { vmax }) => (phi.clamp(-vmax, vmax), psi.clamp(-vmax, vmax)),
            None => (phi, psi),
        }
    }

    fn edge_coefficients(&self, axis: Axis) -> EdgeCoefficients {
        match axis {
            Axis::X => self.edges.sides,
            Axis::Y => self.edges.top_bottom,
        }
    }

    /// Stencil at `(i, j)` with neighbours resolved by the boundary policy.
    fn stencil<'a>(
        &self,
        input: &'a FieldState,
        coeffs: &'a CoefficientFields,
        (i, j): (usize, usize),
    ) -> Stencil<'a> {
        let (nx, ny) = input.shape();
        Stencil::new(
            input,
            coeffs,
            (i, j),
            resolve(i, nx, self.policy.treatment(Axis::X)),
            resolve(j, ny, self.policy.treatment(Axis::Y)),
        )
    }

    /// Advance `input` by one micro-step into `output`.
    ///
    /// `time` is the index of the micro-step being produced, starting at 1,
    /// and only drives the oscillating left boundary.
    pub fn step(
        &self,
        input: &FieldState,
        output: &mut FieldState,
        mask: &DomainMask,
        coeffs: &CoefficientFields,
        time: u64,
    ) {
        debug_assert_eq!(input.shape(), output.shape());
        debug_assert_eq!(input.shape(), mask.shape());

        self.interior_pass(input, output, mask, coeffs);
        for edge in Edge::ALL {
            self.edge_pass(edge, input, output, mask, coeffs);
        }
        self.corner_pass(input, output, mask, coeffs);

        if let Some(drive) = self.drive {
            self.drive_left(drive, time, input, output, mask);
        }
    }

    /// Two micro-steps, `state → scratch → state`.
    ///
    /// For the Schrödinger variant this is one full rotation; for the wave
    /// variant it is two time steps. `time` is the last micro-step already taken.
    pub fn advance(
        &self,
        state: &mut FieldState,
        scratch: &mut FieldState,
        mask: &DomainMask,
        coeffs: &CoefficientFields,
        time: u64,
    ) {
        self.step(state, scratch, mask, coeffs, time + 1);
        self.step(scratch, state, mask, coeffs, time + 2);
    }

    fn interior_pass(
        &self,
        input: &FieldState,
        output: &mut FieldState,
        mask: &DomainMask,
        coeffs: &CoefficientFields,
    ) {
        let (nx, ny) = input.shape();

        Zip::indexed(output.phi.slice_mut(s![1..nx - 1, 1..ny - 1]))
            .and(output.psi.slice_mut(s![1..nx - 1, 1..ny - 1]))
            .par_for_each(|(a, b), phi_out, psi_out| {
                let (i, j) = (a + 1, b + 1);
                let (phi, psi) = if self.is_active(mask, i, j) {
                    let cell = Stencil::new(input, coeffs, (i, j), [i - 1, i + 1], [j - 1, j + 1]);
                    self.clamped(self.rule.bulk(&cell))
                } else {
                    input.at(i, j)
                };
                *phi_out = phi;
                *psi_out = psi;
            });
    }

    fn edge_pass(
        &self,
        edge: Edge,
        input: &FieldState,
        output: &mut FieldState,
        mask: &DomainMask,
        coeffs: &CoefficientFields,
    ) {
        let (nx, ny) = input.shape();
        let treatment = self.policy.treatment(edge.axis());
        let edge_coeffs = self.edge_coefficients(edge.axis());

        let updates: Vec<(usize, usize, f64, f64)> = edge
            .cells(nx, ny)
            .into_par_iter()
            .map(|(i, j)| {
                let (phi, psi) = if !self.is_active(mask, i, j) {
                    input.at(i, j)
                } else {
                    let cell = self.stencil(input, coeffs, (i, j));
                    let next = match treatment {
                        EdgeTreatment::Absorb => {
                            let (ni, nj) = edge.inward((i, j));
                            self.rule.absorbing(&cell, input.at(ni, nj), edge_coeffs)
                        }
                        EdgeTreatment::Clamp | EdgeTreatment::Wrap => self.rule.bulk(&cell),
                    };
                    self.clamped(next)
                };
                (i, j, phi, psi)
            })
            .collect();

        for (i, j, phi, psi) in updates {
            output.phi[[i, j]] = phi;
            output.psi[[i, j]] = psi;
        }
    }

    fn corner_pass(
        &self,
        input: &FieldState,
        output: &mut FieldState,
        mask: &DomainMask,
        coeffs: &CoefficientFields,
    ) {
        let (nx, ny) = input.shape();
        let absorb_x = self.policy.treatment(Axis::X) == EdgeTreatment::Absorb;
        let absorb_y = self.policy.treatment(Axis::Y) == EdgeTreatment::Absorb;

        for (i, j) in [(0, 0), (0, ny - 1), (nx - 1, 0), (nx - 1, ny - 1)] {
            let (phi, psi) = if !self.is_active(mask, i, j) {
                input.at(i, j)
            } else {
                let cell = self.stencil(input, coeffs, (i, j));
                let next = if absorb_x || absorb_y {
                    let mut inward = Vec::with_capacity(2);
                    if absorb_x {
                        let edge = if i == 0 { Edge::Left } else { Edge::Right };
                        let (ni, nj) = edge.inward((i, j));
                        inward.push(input.at(ni, nj));
                    }
                    if absorb_y {
                        let edge = if j == 0 { Edge::Bottom } else { Edge::Top };
                        let (ni, nj) = edge.inward((i, j));
                        inward.push(input.at(ni, nj));
                    }
                    let n = inward.len() as f64;
                    let mean = inward
                        .iter()
                        .fold((0.0, 0.0), |(p, q), &(a, b)| (p + a / n, q + b / n));
                    let axis = if absorb_x { Axis::X } else { Axis::Y };
                    self.rule.absorbing(&cell, mean, self.edge_coefficients(axis))
                } else {
                    self.rule.bulk(&cell)
                };
                self.clamped(next)
            };
            output.phi[[i, j]] = phi;
            output.psi[[i, j]] = psi;
        }
    }

    fn drive_left(
        &self,
        drive: Oscillation,
        time: u64,
        input: &FieldState,
        output: &mut FieldState,
        mask: &DomainMask,
    ) {
        let (_, ny) = input.shape();
        let value = drive.value_at(time);
        for j in 0..ny {
            if self.is_active(mask, 0, j) {
                output.phi[[0, j]] = value;
                output.psi[[0, j]] = input.phi[[0, j]];
            }
        }
    }
}
