use crate::diagnostics::Probe;
use crate::domain::{DomainMask, DomainShape, Region};
use crate::grid::Grid;
use crate::initial::Packet;
use crate::physics::{PhysicsParams, Variant};
use crate::simulation::{Reinjection, RunParams, Simulation, Statistic};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// Built-in configuration used when no file is given.
pub const DEMO_CONFIG: &str = include_str!("../configs/ellipse.toml");

/// Lattice size and physical extent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl GridConfig {
    pub fn to_grid(&self) -> Result<Grid> {
        Ok(Grid::new(self.nx, self.ny, self.xmin, self.xmax, self.ymin, self.ymax)?)
    }
}

/// Stand-in billiard shapes so the driver is runnable without a geometry collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum DomainConfig {
    /// Every cell is medium A.
    #[default]
    Full,
    /// Ellipse with semi-axes `a`, `b` centred at the origin. A ring of relative
    /// width `secondary_margin` outside it is medium B.
    Ellipse {
        a: f64,
        b: f64,
        #[serde(default)]
        secondary_margin: f64,
    },
}

impl DomainConfig {
    fn validate(&self) -> Result<()> {
        if let DomainConfig::Ellipse {
            a,
            b,
            secondary_margin,
        } = *self
        {
            if !(a > 0.0) || !(b > 0.0) {
                return Err(anyhow!(
                    "Ellipse semi-axes must be positive (a={}, b={})",
                    a,
                    b
                ));
            }
            if !(secondary_margin >= 0.0) {
                return Err(anyhow!(
                    "secondary_margin must be non-negative, got {}",
                    secondary_margin
                ));
            }
        }
        Ok(())
    }
}

impl DomainShape for DomainConfig {
    fn region(&self, x: f64, y: f64) -> Region {
        match *self {
            DomainConfig::Full => Region::Primary,
            DomainConfig::Ellipse {
                a,
                b,
                secondary_margin,
            } => {
                let r = ((x / a).powi(2) + (y / b).powi(2)).sqrt();
                if r <= 1.0 {
                    Region::Primary
                } else if r <= 1.0 + secondary_margin {
                    Region::Secondary
                } else {
                    Region::Outside
                }
            }
        }
    }
}

/// Initial packet. The first one listed overwrites the field, the rest are
/// superimposed with their `factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacketConfig {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
    pub packet: Packet,
}

/// Tick loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_substeps")]
    pub substeps: usize,
    #[serde(default = "default_renormalise")]
    pub renormalise: bool,
    #[serde(default)]
    pub statistic: Statistic,
    #[serde(default = "default_report_period")]
    pub report_period: u64,
}

fn default_ticks() -> u64 {
    1000
}

fn default_substeps() -> usize {
    25
}

fn default_renormalise() -> bool {
    true
}

fn default_report_period() -> u64 {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            substeps: default_substeps(),
            renormalise: default_renormalise(),
            statistic: Statistic::default(),
            report_period: default_report_period(),
        }
    }
}

impl RunConfig {
    pub fn params(&self) -> RunParams {
        RunParams {
            substeps: self.substeps,
            renormalise: self.renormalise,
            statistic: self.statistic,
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    #[serde(default)]
    pub physics: PhysicsParams,
    #[serde(default)]
    pub domain: DomainConfig,
    pub packets: Vec<PacketConfig>,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub probes: Vec<Probe>,
    #[serde(default)]
    pub reinjection: Option<Reinjection>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config file '{}'", path))
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn demo() -> Result<Self> {
        Self::parse(DEMO_CONFIG).context("Built-in demo configuration is invalid")
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        let grid = self.grid.to_grid()?;
        self.physics.validate()?;
        self.domain.validate()?;

        let first = self
            .packets
            .first()
            .ok_or_else(|| anyhow!("At least one packet must be defined"))?;
        if first.factor.is_some() {
            return Err(anyhow!("The first packet overwrites the field and takes no factor"));
        }
        for (idx, p) in self.packets.iter().enumerate() {
            p.packet
                .validate()
                .with_context(|| format!("Packet {} is invalid", idx))?;
        }

        for probe in &self.probes {
            probe.cell(&grid)?;
        }

        if let Some(r) = &self.reinjection {
            if r.every == 0 {
                return Err(anyhow!("reinjection.every must be at least 1"));
            }
            r.packet.validate().context("Reinjection packet is invalid")?;
        }

        if self.run.statistic == Statistic::Energy && self.physics.variant != Variant::Wave {
            return Err(anyhow!("The energy statistic is only defined for the wave variant"));
        }

        Ok(())
    }

    /// Assemble a ready-to-run simulation with its initial field in place.
    pub fn build(&self) -> Result<Simulation> {
        let grid = self.grid.to_grid()?;
        if !grid.has_square_cells() {
            warn!(
                dx = grid.dx(),
                dy = grid.dy(),
                "Cells are not square, the y spacing is ignored by the stencil"
            );
        }
        let mask = DomainMask::build(&grid, &self.domain);

        let mut sim = Simulation::new(grid, mask, self.physics.clone(), self.run.params())?
            .with_probes(&self.probes)?;
        if let Some(r) = self.reinjection {
            sim = sim.with_reinjection(r)?;
        }

        for (idx, p) in self.packets.iter().enumerate() {
            if idx == 0 {
                sim.seed(p.x, p.y, &p.packet);
            } else {
                sim.add(p.factor.unwrap_or(1.0), p.x, p.y, &p.packet);
            }
        }
        // A complex field starts at unit probability
        sim.normalise();

        Ok(sim)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        info!("=== Simulation Configuration ===");
        info!(
            "Grid: {}x{} over [{}, {}] x [{}, {}]",
            self.grid.nx,
            self.grid.ny,
            self.grid.xmin,
            self.grid.xmax,
            self.grid.ymin,
            self.grid.ymax
        );
        info!(
            "Physics: {:?}, boundary={:?}",
            self.physics.variant, self.physics.boundary
        );
        match self.physics.variant {
            Variant::Wave => info!(
                "  courant={}, damping={}, stiffness={}",
                self.physics.courant, self.physics.damping, self.physics.stiffness
            ),
            Variant::Schrodinger => info!(
                "  dt={}, hbar={}",
                self.physics.quantum.dt, self.physics.quantum.hbar
            ),
        }
        if self.physics.two_speeds {
            info!(
                "  Medium B: courant={}, damping={}",
                self.physics.courant_b, self.physics.damping_b
            );
        }
        info!("Domain: {:?}", self.domain);
        info!("Packets: {} packet(s)", self.packets.len());
        for (i, p) in self.packets.iter().enumerate() {
            info!(
                "  Packet {}: position ({}, {}), factor={}",
                i,
                p.x,
                p.y,
                p.factor.unwrap_or(1.0)
            );
        }
        info!(
            "Run: {} ticks x {} sub-steps, statistic={:?}",
            self.run.ticks, self.run.substeps, self.run.statistic
        );
        if !self.probes.is_empty() {
            info!("Probes: {} probe(s)", self.probes.len());
        }
        if let Some(r) = &self.reinjection {
            info!("Reinjection: every {} ticks at ({}, {})", r.every, r.x, r.y);
        }
        info!("================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BoundaryPolicy;
    use approx::assert_relative_eq;

    const MINIMAL: &str = r#"
        [grid]
        nx = 40
        ny = 20
        xmin = -2.0
        xmax = 2.0
        ymin = -1.0
        ymax = 1.0

        [[packets]]
        x = 0.0
        y = 0.0
        packet = { kind = "pulse", variance = 0.05, wavelength = 0.1 }
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.physics, PhysicsParams::default());
        assert_eq!(config.domain, DomainConfig::Full);
        assert_eq!(config.run.substeps, 25);
        assert!(config.probes.is_empty());
        assert!(config.reinjection.is_none());
    }

    #[test]
    fn test_bundled_configs_parse() {
        let demo = Config::demo().unwrap();
        assert!(matches!(demo.domain, DomainConfig::Ellipse { .. }));
        assert_eq!(demo.probes.len(), 1);

        let quantum = Config::parse(include_str!("../configs/schrodinger.toml")).unwrap();
        assert_eq!(quantum.physics.variant, Variant::Schrodinger);
        assert_eq!(quantum.physics.boundary, BoundaryPolicy::Absorbing);
    }

    #[test]
    fn test_nested_physics_tables() {
        let text = format!(
            "{MINIMAL}\n{}",
            r#"
            [physics]
            boundary = "vertical-periodic"
            courant = 0.1
            two_speeds = true

            [physics.edges.sides]
            stiffness = 0.0
            damping = 2.0e-4

            [physics.oscillate_left]
            amplitude = 0.8
            omega = 0.005
            "#
        );
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.physics.boundary, BoundaryPolicy::VerticalPeriodic);
        assert!(config.physics.two_speeds);
        assert_eq!(config.physics.edges.sides.damping, 2.0e-4);
        assert_eq!(config.physics.edges.top_bottom.damping, 1.0e-7);
        assert!(config.physics.oscillate_left.is_some());
    }

    #[test]
    fn test_incompatible_physics_fails_fast() {
        let text = format!(
            "{MINIMAL}\n{}",
            r#"
            [physics]
            boundary = "periodic"
            two_speeds = true
            "#
        );
        assert!(Config::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_missing_packets_and_bad_probes() {
        let no_packets = r#"
            packets = []
            [grid]
            nx = 10
            ny = 10
            xmin = 0.0
            xmax = 1.0
            ymin = 0.0
            ymax = 1.0
        "#;
        assert!(Config::parse(no_packets).is_err());

        let text = format!("{MINIMAL}\n[[probes]]\nx = 3.0\ny = 0.0\n");
        assert!(Config::parse(&text).is_err());
    }

    #[test]
    fn test_first_packet_takes_no_factor() {
        let text = MINIMAL.replace("y = 0.0\n", "y = 0.0\n        factor = 2.0\n");
        assert!(Config::parse(&text).is_err());
    }

    #[test]
    fn test_ellipse_regions() {
        let domain = DomainConfig::Ellipse {
            a: 2.0,
            b: 1.0,
            secondary_margin: 0.5,
        };
        assert_eq!(domain.region(0.0, 0.0), Region::Primary);
        assert_eq!(domain.region(1.9, 0.0), Region::Primary);
        assert_eq!(domain.region(2.5, 0.0), Region::Secondary);
        assert_eq!(domain.region(0.0, 1.6), Region::Outside);
    }

    #[test]
    fn test_build_seeds_then_adds() {
        let text = format!(
            "{MINIMAL}\n{}",
            r#"
            [[packets]]
            x = 0.0
            y = 0.0
            factor = -1.0
            packet = { kind = "pulse", variance = 0.05, wavelength = 0.1 }
            "#
        );
        let config = Config::parse(&text).unwrap();
        let sim = config.build().unwrap();
        // The second packet cancels the first
        assert!(sim.state().phi.iter().all(|v| v.abs() < 1e-15));
    }

    #[test]
    fn test_non_square_cells_still_build() {
        let config = Config::parse(&MINIMAL.replace("ny = 20", "ny = 10")).unwrap();
        let grid = config.grid.to_grid().unwrap();
        assert!(!grid.has_square_cells());
        let sim = config.build().unwrap();
        assert_eq!(sim.grid().shape(), (40, 10));
    }

    #[test]
    fn test_build_normalises_complex_field() {
        let text = MINIMAL
            .replace(
                r#"packet = { kind = "pulse", variance = 0.05, wavelength = 0.1 }"#,
                r#"packet = { kind = "wavepacket", amplitude = 3.0, scale = 0.3, px = 2.0 }"#,
            )
            .replace("[[packets]]", "[physics]\nvariant = \"schrodinger\"\n\n[[packets]]");
        let config = Config::parse(&text).unwrap();
        let sim = config.build().unwrap();
        assert_relative_eq!(sim.aggregate(), 1.0, epsilon = 1e-12);
    }
}
