use crate::diagnostics::{DiagnosticsSink, Probe};
use crate::domain::DomainMask;
use crate::error::{ConfigError, Result};
use crate::grid::Grid;
use crate::initial::{self, Packet};
use crate::materials::CoefficientFields;
use crate::normalise;
use crate::physics::{PhysicsParams, Variant};
use crate::stencil::{Rule, Stepper};
use crate::wavefield::FieldState;
use serde::{Deserialize, Serialize};
use std::io;
use tracing::{debug, info, warn};

/// Statistic written to the diagnostics log after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Statistic {
    /// Mean squared magnitude over the domain.
    #[default]
    Mean,
    /// Discrete leapfrog energy (wave variant only).
    Energy,
}

/// Per-tick behaviour of the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub substeps: usize, // Sub-steps (two micro-steps each) per tick
    pub renormalise: bool, // Rescale the complex field to unit probability after each tick
    pub statistic: Statistic,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            substeps: 1,
            renormalise: true,
            statistic: Statistic::Mean,
        }
    }
}

/// Packet added back into the field at a fixed tick period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reinjection {
    pub every: u64,
    #[serde(default = "default_factor")]
    pub factor: f64,
    pub x: f64,
    pub y: f64,
    pub packet: Packet,
}

fn default_factor() -> f64 {
    1.0
}

/// What the renderer needs after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tick: u64,
    pub aggregate: f64,
    pub scale: f64,
}

pub struct Simulation {
    grid: Grid,
    mask: DomainMask,
    coeffs: CoefficientFields,
    params: PhysicsParams,
    run: RunParams,
    stepper: Stepper<Rule>,
    state: FieldState,
    scratch: FieldState,
    probes: Vec<(usize, usize)>,
    samples: Vec<(u64, Vec<f64>)>,
    reinjection: Option<Reinjection>,
    micro_step: u64,
    current_tick: u64,
}

impl Simulation {
    /// Validate the configuration and allocate a zero field.
    pub fn new(
        grid: Grid,
        mask: DomainMask,
        params: PhysicsParams,
        run: RunParams,
    ) -> Result<Self> {
        params.validate()?;
        if mask.shape() != grid.shape() {
            return Err(ConfigError::ShapeMismatch {
                expected: grid.shape(),
                found: mask.shape(),
            });
        }
        if run.statistic == Statistic::Energy && params.variant != Variant::Wave {
            return Err(ConfigError::Incompatible(
                "the energy statistic is only defined for the wave variant".to_string(),
            ));
        }

        let coeffs = CoefficientFields::new(&mask, &params);
        if params.variant == Variant::Wave && !coeffs.is_stable() {
            warn!(
                max_courant = coeffs.max_courant(),
                "Courant number exceeds the CFL limit, the field will grow without bound"
            );
        }
        if mask.inside_count() == 0 {
            warn!("Domain mask has no inside cells");
        }

        let stepper = Stepper::from_params(&params, &grid);
        let (nx, ny) = grid.shape();
        Ok(Self {
            grid,
            mask,
            coeffs,
            params,
            run,
            stepper,
            state: FieldState::new(nx, ny),
            scratch: FieldState::new(nx, ny),
            probes: Vec::new(),
            samples: Vec::new(),
            reinjection: None,
            micro_step: 0,
            current_tick: 0,
        })
    }

    pub fn with_probes(mut self, probes: &[Probe]) -> Result<Self> {
        self.probes = probes
            .iter()
            .map(|p| p.cell(&self.grid))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    pub fn with_reinjection(mut self, reinjection: Reinjection) -> Result<Self> {
        if reinjection.every == 0 {
            return Err(ConfigError::InvalidParameter(
                "reinjection period must be at least one tick".to_string(),
            ));
        }
        self.reinjection = Some(reinjection);
        Ok(self)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn mask(&self) -> &DomainMask {
        &self.mask
    }

    pub fn coefficients(&self) -> &CoefficientFields {
        &self.coeffs
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    /// Replace the field wholesale, e.g. with one computed elsewhere.
    pub fn set_state(&mut self, state: FieldState) -> Result<()> {
        if state.shape() != self.grid.shape() {
            return Err(ConfigError::ShapeMismatch {
                expected: self.grid.shape(),
                found: state.shape(),
            });
        }
        self.state = state;
        Ok(())
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Micro-steps taken since construction.
    pub fn micro_steps(&self) -> u64 {
        self.micro_step
    }

    /// Overwrite the field with a packet centred at `(x, y)`.
    pub fn seed(&mut self, x: f64, y: f64, packet: &Packet) {
        initial::seed_packet(&mut self.state, &self.grid, &self.mask, x, y, packet);
    }

    /// Superimpose `factor × packet` centred at `(x, y)`.
    pub fn add(&mut self, factor: f64, x: f64, y: f64, packet: &Packet) {
        initial::add_packet(&mut self.state, &self.grid, &self.mask, factor, x, y, packet);
    }

    pub fn aggregate(&self) -> f64 {
        normalise::compute_aggregate(&self.state, &self.mask, self.params.variant)
    }

    /// Discrete leapfrog energy of the current wave field.
    pub fn energy(&self) -> f64 {
        normalise::wave_energy(
            &self.state,
            &self.mask,
            &self.coeffs,
            self.params.boundary,
            self.params.stiffness,
        )
    }

    /// Measure the field and, for a complex field, rescale it to unit probability.
    ///
    /// The returned frame carries the aggregate measured before rescaling.
    pub fn normalise(&mut self) -> Frame {
        let aggregate = self.aggregate();
        if self.params.variant == Variant::Schrodinger && self.run.renormalise {
            normalise::renormalise(&mut self.state, &self.mask, aggregate);
        }
        Frame {
            tick: self.current_tick,
            aggregate,
            scale: normalise::derive_scale(aggregate),
        }
    }

    /// Run one tick: the configured sub-steps, any due re-injection, then the normaliser.
    ///
    /// Probe samples taken during the tick are kept until the next tick starts.
    pub fn tick(&mut self) -> Frame {
        self.samples.clear();
        for _ in 0..self.run.substeps {
            self.sub_step();
        }
        self.current_tick += 1;

        if let Some(r) = &self.reinjection {
            if self.current_tick % r.every == 0 {
                debug!(tick = self.current_tick, "Re-injecting packet");
                initial::add_packet(
                    &mut self.state,
                    &self.grid,
                    &self.mask,
                    r.factor,
                    r.x,
                    r.y,
                    &r.packet,
                );
            }
        }

        let frame = self.normalise();
        debug!(
            tick = frame.tick,
            aggregate = frame.aggregate,
            scale = frame.scale,
            "Tick complete"
        );
        frame
    }

    /// [`Simulation::tick`], then hand its probe samples and statistic to `sink`.
    pub fn tick_with(&mut self, sink: &mut dyn DiagnosticsSink) -> io::Result<Frame> {
        let frame = self.tick();
        for (step, values) in &self.samples {
            sink.record_probes(*step, values)?;
        }
        let logged = match self.run.statistic {
            Statistic::Mean => frame.aggregate,
            Statistic::Energy => self.energy(),
        };
        sink.record_aggregate(frame.tick, logged)?;
        Ok(frame)
    }

    /// Probe samples `(micro-step, values)` taken during the last tick.
    pub fn samples(&self) -> &[(u64, Vec<f64>)] {
        &self.samples
    }

    fn sub_step(&mut self) {
        if self.probes.is_empty() {
            self.stepper.advance(
                &mut self.state,
                &mut self.scratch,
                &self.mask,
                &self.coeffs,
                self.micro_step,
            );
            self.micro_step += 2;
            return;
        }

        self.micro_step += 1;
        self.stepper.step(
            &self.state,
            &mut self.scratch,
            &self.mask,
            &self.coeffs,
            self.micro_step,
        );
        self.samples
            .push((self.micro_step, sample(&self.probes, &self.scratch)));

        self.micro_step += 1;
        self.stepper.step(
            &self.scratch,
            &mut self.state,
            &self.mask,
            &self.coeffs,
            self.micro_step,
        );
        self.samples
            .push((self.micro_step, sample(&self.probes, &self.state)));
    }

    /// Tick until `ticks` have been taken, reporting every `report_period` ticks.
    pub fn run(
        &mut self,
        ticks: u64,
        report_period: u64,
        sink: &mut dyn DiagnosticsSink,
    ) -> io::Result<Option<Frame>> {
        info!(
            nx = self.grid.nx,
            ny = self.grid.ny,
            ticks,
            substeps = self.run.substeps,
            "Starting simulation"
        );

        let mut last = None;
        while self.current_tick < ticks {
            let frame = self.tick_with(sink)?;
            if report_period > 0 && frame.tick % report_period == 0 {
                info!(
                    "Tick {}/{} (aggregate={:.6e}, scale={:.4})",
                    frame.tick, ticks, frame.aggregate, frame.scale
                );
            }
            last = Some(frame);
        }

        info!("Simulation complete!");
        Ok(last)
    }
}

fn sample(probes: &[(usize, usize)], field: &FieldState) -> Vec<f64> {
    probes.iter().map(|&(i, j)| field.phi[[i, j]]).collect()
}
