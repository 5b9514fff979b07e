//! Pivoted pricing results

use std::io::Write;

use serde::{Deserialize, Serialize};

/// One (rate, loan life) row of the pivot, one value per default probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub rate: f64,
    pub loan_life: u32,
    /// Risk-adjusted IRR per default-probability column; None when every
    /// sample of that cell failed to solve
    pub values: Vec<Option<f64>>,
}

/// Risk-adjusted IRR table indexed by (rate, loan life) with default
/// probabilities as columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTable {
    pub default_probabilities: Vec<f64>,
    pub rows: Vec<ScenarioRow>,

    /// Population standard deviation of all IRR samples, subtracted from
    /// every cell mean
    pub std_dev: f64,

    pub sample_count: usize,
    pub skipped: usize,

    /// Nominal annual rate of the priced loan
    pub loan_rate: f64,

    /// Periodic IRR of the raw, default-free stream
    pub base_irr: Option<f64>,
}

impl ScenarioTable {
    /// Look up a cell by exact grid values
    pub fn get(&self, rate: f64, loan_life: u32, default_probability: f64) -> Option<f64> {
        let col = self
            .default_probabilities
            .iter()
            .position(|&p| (p - default_probability).abs() < 1e-12)?;
        self.rows
            .iter()
            .find(|row| row.loan_life == loan_life && (row.rate - rate).abs() < 1e-12)
            .and_then(|row| row.values[col])
    }

    /// Write the pivot as CSV: rate, loan_life, then one column per probability
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["rate".to_string(), "loan_life".to_string()];
        header.extend(self.default_probabilities.iter().map(|p| format!("pd_{}", p)));
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![format!("{}", row.rate), row.loan_life.to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|irr| format!("{:.6}", irr)).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ScenarioTable {
        ScenarioTable {
            default_probabilities: vec![0.1, 0.2],
            rows: vec![
                ScenarioRow { rate: 0.3, loan_life: 5, values: vec![Some(0.05), None] },
                ScenarioRow { rate: 0.35, loan_life: 5, values: vec![Some(0.07), Some(0.06)] },
            ],
            std_dev: 0.01,
            sample_count: 3,
            skipped: 1,
            loan_rate: 0.05,
            base_irr: Some(0.004),
        }
    }

    #[test]
    fn test_get() {
        let t = table();
        assert_eq!(t.get(0.35, 5, 0.2), Some(0.06));
        assert_eq!(t.get(0.3, 5, 0.2), None);
        assert_eq!(t.get(0.3, 10, 0.1), None);
    }

    #[test]
    fn test_write_csv() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "rate,loan_life,pd_0.1,pd_0.2");
        assert_eq!(lines[1], "0.3,5,0.050000,");
        assert_eq!(lines.len(), 3);
    }
}
