//! Report rendering and ensemble CSV files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use sim_engine::ensemble::PathEnsemble;
use sim_risk::analytics::RiskReport;
use sim_risk::scenarios::ScenarioComparison;

use crate::config::OutputFormat;
use crate::error::{CliError, Result};

/// Print `value` as pretty JSON or as the given table.
pub fn emit<T, F>(value: &T, format: OutputFormat, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print!("{}", table(value)),
    }
    Ok(())
}

/// Plain-text summary of one risk report.
pub fn render_report(report: &RiskReport) -> String {
    ReportTable(report).to_string()
}

struct ReportTable<'a>(&'a RiskReport);

impl fmt::Display for ReportTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let t = &report.terminal;
        writeln!(f, "Portfolio risk report")?;
        writeln!(f, "----------------------------------------")?;
        writeln!(f, "{:<28} {:>16.2}", "Initial capital", report.x0)?;
        writeln!(f, "{:<28} {:>16.4}", "Horizon (years)", report.horizon)?;
        writeln!(f, "{:<28} {:>16}", "Paths", report.n_paths)?;
        writeln!(f, "{:<28} {:>16}", "Time points", report.n_steps)?;
        writeln!(f)?;
        writeln!(f, "Terminal value")?;
        writeln!(f, "  {:<26} {:>16.2}", "mean", t.mean)?;
        writeln!(f, "  {:<26} {:>16.2}", "median", t.median)?;
        writeln!(f, "  {:<26} {:>16.2}", "std", t.std)?;
        writeln!(f, "  {:<26} {:>16.4}", "skew", t.skew)?;
        writeln!(f, "  {:<26} {:>16.4}", "excess kurtosis", t.kurtosis)?;
        writeln!(f, "  {:<26} {:>16.2}", "min", t.min)?;
        writeln!(f, "  {:<26} {:>16.2}", "max", t.max)?;
        writeln!(f)?;
        writeln!(f, "Tail risk")?;
        for tail in &report.tail_risk {
            let marker = if tail.cvar_from_var { " *" } else { "" };
            writeln!(
                f,
                "  {:>5.1}%  VaR {:>14.2} ({:>6.2}%)  CVaR {:>14.2} ({:>6.2}%){}",
                tail.confidence * 100.0,
                tail.var,
                tail.var_pct,
                tail.cvar,
                tail.cvar_pct,
                marker
            )?;
        }
        if report.tail_risk.iter().any(|t| t.cvar_from_var) {
            writeln!(f, "  * empty tail, CVaR reported as VaR")?;
        }
        writeln!(f)?;
        let r = &report.returns;
        writeln!(f, "Returns")?;
        writeln!(f, "  {:<26} {:>15.2}%", "mean annual", r.mean_annual_return * 100.0)?;
        writeln!(f, "  {:<26} {:>15.2}%", "std annual", r.std_annual_return * 100.0)?;
        writeln!(f, "  {:<26} {:>16.4}", "Sharpe ratio", r.sharpe_ratio)?;
        writeln!(f)?;
        let d = &report.drawdown;
        let sample_note = if d.sampled { " (sampled)" } else { "" };
        writeln!(f, "Drawdown over {} paths{}", d.paths_used, sample_note)?;
        writeln!(f, "  {:<26} {:>15.2}%", "mean max drawdown", d.mean_max_drawdown_pct)?;
        writeln!(f, "  {:<26} {:>15.2}%", "worst max drawdown", d.worst_max_drawdown_pct)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<28} {:>15.2}%",
            "Probability of loss", report.probability_of_loss_pct
        )
    }
}

/// Stress results with baseline deltas.
#[derive(Debug, Serialize)]
pub struct StressOutput<'a> {
    /// Reports keyed by scenario name
    pub scenarios: &'a BTreeMap<String, RiskReport>,
    /// Deltas against the baseline
    pub comparison: Option<&'a ScenarioComparison>,
}

/// Plain-text side-by-side scenario table.
pub fn render_stress(output: &StressOutput<'_>) -> String {
    output.to_string()
}

impl fmt::Display for StressOutput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>14} {:>14} {:>9} {:>9} {:>8} {:>8}",
            "scenario", "mean", "std", "VaR95%", "CVaR95%", "Sharpe", "P(loss)"
        )?;
        writeln!(f, "{}", "-".repeat(80))?;
        let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));
        for (name, report) in self.scenarios {
            writeln!(
                f,
                "{:<12} {:>14.2} {:>14.2} {:>9} {:>9} {:>8.3} {:>7.2}%",
                name,
                report.terminal.mean,
                report.terminal.std,
                pct(report.var_pct(0.95)),
                pct(report.cvar_pct(0.95)),
                report.returns.sharpe_ratio,
                report.probability_of_loss_pct
            )?;
        }

        let Some(cmp) = self.comparison else {
            return Ok(());
        };
        writeln!(f)?;
        writeln!(f, "Change against baseline")?;
        writeln!(
            f,
            "{:<12} {:>14} {:>14} {:>9} {:>9} {:>8}",
            "scenario", "mean", "std", "VaR95%", "CVaR95%", "Sharpe"
        )?;
        let pp = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:+.2}", v));
        for (name, delta) in &cmp.deltas {
            writeln!(
                f,
                "{:<12} {:>+14.2} {:>+14.2} {:>9} {:>9} {:>+8.3}",
                name,
                delta.mean_delta,
                delta.std_delta,
                pp(delta.var95_pct_delta),
                pp(delta.cvar95_pct_delta),
                delta.sharpe_delta
            )?;
        }
        if let Some(worst) = &cmp.worst_scenario {
            writeln!(f)?;
            writeln!(f, "Worst scenario by 95% VaR: {}", worst)?;
        }
        Ok(())
    }
}

/// Write an ensemble as CSV, one row per path.
///
/// The header is `path` followed by the time of each column in years, so
/// the grid survives a round trip exactly.
pub fn write_ensemble_csv(path: &Path, ensemble: &PathEnsemble) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = Vec::with_capacity(ensemble.n_steps() + 1);
    header.push("path".to_string());
    header.extend(ensemble.time_grid().iter().map(|t| t.to_string()));
    writer.write_record(&header)?;

    for (i, row) in ensemble.rows().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(i.to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| CliError::io(path, e))?;
    Ok(())
}

fn parse_cell(path: &Path, what: &str, field: &str) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|_| {
        CliError::Input(format!(
            "{} {}: '{}' is not a number",
            path.display(),
            what,
            field
        ))
    })
}

/// Read an ensemble CSV written by [`write_ensemble_csv`].
///
/// The time grid comes from the header and must start at zero and be
/// strictly increasing.
pub fn read_ensemble_csv(path: &Path) -> Result<PathEnsemble> {
    let mut reader = csv::Reader::from_path(path)?;
    let time_grid = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|field| parse_cell(path, "header", field))
        .collect::<Result<Vec<f64>>>()?;
    if time_grid.len() < 2 {
        return Err(CliError::Input(format!(
            "{} needs a path column and at least two time columns",
            path.display()
        )));
    }
    if time_grid[0] != 0.0 || time_grid.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(CliError::Input(format!(
            "{}: time grid must start at 0 and be strictly increasing",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let what = format!("row {}", line + 1);
        let row = record
            .iter()
            .skip(1)
            .map(|field| parse_cell(path, &what, field))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(PathEnsemble::from_rows(&rows, time_grid)?)
}

/// Common starting value of every path.
pub fn initial_capital(ensemble: &PathEnsemble) -> Result<f64> {
    let start = ensemble.column(0);
    let x0 = start[0];
    if !(x0.is_finite() && x0 > 0.0) || start.iter().any(|&v| v != x0) {
        return Err(CliError::Input(
            "every path must start at the same positive capital".to_string(),
        ));
    }
    Ok(x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_risk::analytics::analyze_paths;

    fn sample_report() -> RiskReport {
        let rows = vec![
            vec![100.0, 104.0, 98.0],
            vec![100.0, 97.0, 103.0],
            vec![100.0, 101.0, 110.0],
        ];
        analyze_paths(&rows, &[0.0, 0.5, 1.0], 100.0, 0.02, &[0.95, 0.99]).unwrap()
    }

    #[test]
    fn test_render_report_sections() {
        let text = render_report(&sample_report());
        assert!(text.contains("Terminal value"));
        assert!(text.contains("Tail risk"));
        assert!(text.contains("95.0%"));
        assert!(text.contains("99.0%"));
        assert!(text.contains("Sharpe ratio"));
        assert!(text.contains("Probability of loss"));
    }

    #[test]
    fn test_render_stress_with_comparison() {
        let mut reports = BTreeMap::new();
        reports.insert("baseline".to_string(), sample_report());
        reports.insert("drift_shock".to_string(), sample_report());
        let cmp = ScenarioComparison::from_reports(&reports);
        let text = render_stress(&StressOutput {
            scenarios: &reports,
            comparison: cmp.as_ref(),
        });
        assert!(text.contains("baseline"));
        assert!(text.contains("Change against baseline"));
        assert!(text.contains("Worst scenario"));
    }

    #[test]
    fn test_stress_output_json() {
        let mut reports = BTreeMap::new();
        reports.insert("baseline".to_string(), sample_report());
        let json = serde_json::to_value(StressOutput {
            scenarios: &reports,
            comparison: None,
        })
        .unwrap();
        assert!(json["scenarios"]["baseline"]["terminal"]["mean"].is_number());
        assert!(json["comparison"].is_null());
    }

    #[test]
    fn test_csv_write_then_read() {
        let grid = vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        let ensemble = PathEnsemble::from_rows(
            &[vec![1.0, 1.5, 2.0, 2.5], vec![1.0, 0.75, 0.5, 0.6]],
            grid.clone(),
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.csv");
        write_ensemble_csv(&file, &ensemble).unwrap();

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.starts_with("path,0,0.333"));

        let back = read_ensemble_csv(&file).unwrap();
        assert_eq!(back.to_rows(), ensemble.to_rows());
        assert_eq!(back.time_grid(), grid.as_slice());
        assert_eq!(back.horizon(), 1.0);
        assert_relative_eq!(initial_capital(&back).unwrap(), 1.0);
    }

    #[test]
    fn test_read_rejects_bad_cells() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.csv");
        std::fs::write(&file, "path,0,1\n0,1.0,abc\n").unwrap();
        assert!(matches!(read_ensemble_csv(&file), Err(CliError::Input(_))));

        std::fs::write(&file, "path,0\n0,1.0\n").unwrap();
        assert!(read_ensemble_csv(&file).is_err());
    }

    #[test]
    fn test_read_rejects_bad_time_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("grid.csv");

        std::fs::write(&file, "path,t0,t1\n0,1.0,1.1\n").unwrap();
        assert!(matches!(read_ensemble_csv(&file), Err(CliError::Input(_))));

        std::fs::write(&file, "path,0,0.5,0.5\n0,1.0,1.1,1.2\n").unwrap();
        assert!(matches!(read_ensemble_csv(&file), Err(CliError::Input(_))));

        std::fs::write(&file, "path,0.1,0.5\n0,1.0,1.1\n").unwrap();
        assert!(matches!(read_ensemble_csv(&file), Err(CliError::Input(_))));
    }

    #[test]
    fn test_initial_capital_must_be_shared() {
        let ensemble = PathEnsemble::from_rows(
            &[vec![1.0, 1.1], vec![2.0, 2.1]],
            vec![0.0, 1.0],
        )
        .unwrap();
        assert!(matches!(initial_capital(&ensemble), Err(CliError::Input(_))));
    }
}
