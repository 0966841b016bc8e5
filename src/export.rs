use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::sequencer::{AnalysisReport, FitOutcome};
use crate::types::FilteredSample;

pub const CSV_HEADER: &str = "t(s),x(m),y(m),vx(m/s),vy(m/s)";

/// Write filtered samples as CSV: 4 decimals for time, 6 for the rest.
pub fn write_filtered_csv<W: Write>(writer: &mut W, samples: &[FilteredSample]) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for s in samples {
        writeln!(
            writer,
            "{:.4},{:.6},{:.6},{:.6},{:.6}",
            s.t, s.x, s.y, s.vx, s.vy
        )?;
    }
    Ok(())
}

pub fn export_filtered_to_csv(path: &Path, samples: &[FilteredSample]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_filtered_csv(&mut writer, samples)?;
    writer.flush()?;
    log::info!("Exported {} samples to {}", samples.len(), path.display());
    Ok(())
}

/// Human-facing result of one analysis pass.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSummary {
    pub sample_count: usize,
    /// `None` when there was no fit or the fit was degenerate
    pub a_estimated: Option<f64>,
    pub a_theory: f64,
    /// `v = <a> · t`, when a finite fit exists
    pub equation: Option<String>,
    /// Set when the fitter refused to run
    pub insufficient_data: bool,
}

impl AnalysisSummary {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let fit = report.fit.fit();
        Self {
            sample_count: report.filtered_samples.len(),
            a_estimated: fit.and_then(|f| f.estimate()),
            a_theory: report.a_theory,
            equation: fit.and_then(|f| f.equation()),
            insufficient_data: matches!(report.fit, FitOutcome::InsufficientData { .. }),
        }
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples: {}", self.sample_count)?;
        match self.a_estimated {
            Some(a) => writeln!(f, "a (estimated): {:.4} m/s²", a)?,
            None => writeln!(f, "a (estimated): —")?,
        }
        writeln!(f, "a (theory): {:.4} m/s²", self.a_theory)?;
        match &self.equation {
            Some(eq) => write!(f, "Equation: {}", eq)?,
            None => write!(f, "Equation: —")?,
        }
        if self.insufficient_data {
            write!(f, "\nInsufficient data after filtering (check detection / calibration)")?;
        }
        Ok(())
    }
}
