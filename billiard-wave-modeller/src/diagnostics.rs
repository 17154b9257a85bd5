//! Append-only numeric log of per-tick aggregates and probe samples.

use crate::error::{ConfigError, Result};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Physical location sampled after every sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub x: f64,
    pub y: f64,
}

impl Probe {
    /// Lattice cell nearest to the probe.
    pub fn cell(&self, grid: &Grid) -> Result<(usize, usize)> {
        if !grid.contains_coord(self.x, self.y) {
            return Err(ConfigError::ProbeOutsideGrid {
                x: self.x,
                y: self.y,
            });
        }
        Ok(grid.coord_to_index(self.x, self.y))
    }
}

/// Consumer of the numeric diagnostics a run produces.
pub trait DiagnosticsSink {
    /// Aggregate statistic (energy or probability) after tick `tick`.
    fn record_aggregate(&mut self, tick: u64, aggregate: f64) -> io::Result<()>;

    /// Probe values after micro-step `step`, in probe order.
    fn record_probes(&mut self, step: u64, values: &[f64]) -> io::Result<()>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record_aggregate(&mut self, _tick: u64, _aggregate: f64) -> io::Result<()> {
        Ok(())
    }

    fn record_probes(&mut self, _step: u64, _values: &[f64]) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    pub aggregates: Vec<(u64, f64)>,
    pub probes: Vec<(u64, Vec<f64>)>,
}

impl DiagnosticsSink for MemoryLog {
    fn record_aggregate(&mut self, tick: u64, aggregate: f64) -> io::Result<()> {
        self.aggregates.push((tick, aggregate));
        Ok(())
    }

    fn record_probes(&mut self, step: u64, values: &[f64]) -> io::Result<()> {
        self.probes.push((step, values.to_vec()));
        Ok(())
    }
}

/// Writes one whitespace-separated line per record:
/// `A <tick> <aggregate>` and `P <step> <value>...`.
pub struct WriterLog<W: Write> {
    writer: W,
}

impl<W: Write> WriterLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticsSink for WriterLog<W> {
    fn record_aggregate(&mut self, tick: u64, aggregate: f64) -> io::Result<()> {
        writeln!(self.writer, "A {tick} {aggregate:.15e}")
    }

    fn record_probes(&mut self, step: u64, values: &[f64]) -> io::Result<()> {
        write!(self.writer, "P {step}")?;
        for value in values {
            write!(self.writer, " {value:.15e}")?;
        }
        writeln!(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_cell() {
        let grid = Grid::new(100, 50, -2.0, 2.0, -1.0, 1.0).unwrap();
        let probe = Probe { x: 0.0, y: 0.0 };
        assert_eq!(probe.cell(&grid).unwrap(), (50, 25));

        let outside = Probe { x: 3.0, y: 0.0 };
        assert!(matches!(
            outside.cell(&grid),
            Err(ConfigError::ProbeOutsideGrid { .. })
        ));
    }

    #[test]
    fn test_writer_log_format() {
        let mut log = WriterLog::new(Vec::new());
        log.record_aggregate(3, 0.5).unwrap();
        log.record_probes(12, &[1.0, -0.25]).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A 3 5.000000000000000e-1");
        assert_eq!(lines[1], "P 12 1.000000000000000e0 -2.500000000000000e-1");
    }

    #[test]
    fn test_memory_log_appends() {
        let mut log = MemoryLog::default();
        log.record_aggregate(1, 2.0).unwrap();
        log.record_aggregate(2, 3.0).unwrap();
        log.record_probes(4, &[0.1]).unwrap();
        assert_eq!(log.aggregates, vec![(1, 2.0), (2, 3.0)]);
        assert_eq!(log.probes, vec![(4, vec![0.1])]);
    }
}
