//! Load loan specifications from a CSV loan book

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::Reader;

use super::{AmortizationMethod, LoanSpec, PaymentFrequency, RateType, UpdateFrequency};
use crate::error::LoanError;

/// Raw CSV row matching the loan book columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "AnnualRate")]
    annual_rate: f64,
    #[serde(rename = "TermYears")]
    term_years: u32,
    #[serde(rename = "Method")]
    method: String,
    #[serde(rename = "Frequency")]
    frequency: String,
    #[serde(rename = "RateType", default)]
    rate_type: Option<String>,
    #[serde(rename = "UpdateFrequency", default)]
    update_frequency: Option<String>,
    #[serde(rename = "DownpaymentPct", default)]
    downpayment_pct: Option<f64>,
    #[serde(rename = "StartDate")]
    start_date: String,
}

impl CsvRow {
    fn into_spec(self) -> Result<LoanSpec, Box<dyn std::error::Error>> {
        let start_date = NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d")?;

        let rate_type = match self.rate_type.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse::<RateType>()?,
            _ => RateType::Fixed,
        };
        let update_frequency = match self.update_frequency.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse::<UpdateFrequency>()?,
            _ => UpdateFrequency::Monthly,
        };

        let spec = LoanSpec {
            amount: self.amount,
            annual_rate: self.annual_rate,
            term_years: self.term_years,
            method: self.method.parse::<AmortizationMethod>()?,
            frequency: self.frequency.parse::<PaymentFrequency>()?,
            rate_type,
            update_frequency,
            downpayment_pct: self.downpayment_pct.unwrap_or(0.0),
            start_date,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Load loan specifications from a CSV file
pub fn load_loan_specs(path: &Path) -> Result<Vec<LoanSpec>, Box<dyn std::error::Error>> {
    let reader = Reader::from_path(path)?;
    read_specs(reader)
}

/// Load loan specifications from any reader (file contents, stdin, test fixtures)
pub fn load_loan_specs_from_reader<R: Read>(rdr: R) -> Result<Vec<LoanSpec>, Box<dyn std::error::Error>> {
    read_specs(Reader::from_reader(rdr))
}

fn read_specs<R: Read>(mut reader: Reader<R>) -> Result<Vec<LoanSpec>, Box<dyn std::error::Error>> {
    let mut specs = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let spec = row
            .into_spec()
            .map_err(|e| format!("loan book row {}: {}", line + 1, e))?;
        specs.push(spec);
    }

    if specs.is_empty() {
        return Err(LoanError::invalid_terms("loan book contains no loans").into());
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = "\
Amount,AnnualRate,TermYears,Method,Frequency,RateType,UpdateFrequency,DownpaymentPct,StartDate
100000,0.05,20,French,monthly,fixed,,,2024-01-15
50000,0.06,10,Italian,quarterly,variable,3m,10,2023-06-01
";

    #[test]
    fn test_load_book() {
        let specs = load_loan_specs_from_reader(BOOK.as_bytes()).unwrap();
        assert_eq!(specs.len(), 2);

        assert_eq!(specs[0].method, AmortizationMethod::French);
        assert_eq!(specs[0].rate_type, RateType::Fixed);
        assert_eq!(specs[0].downpayment_pct, 0.0);

        assert_eq!(specs[1].frequency, PaymentFrequency::Quarterly);
        assert_eq!(specs[1].update_frequency, UpdateFrequency::Quarterly);
        assert!((specs[1].principal() - 45_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_row_reports_line() {
        let book = "\
Amount,AnnualRate,TermYears,Method,Frequency,RateType,UpdateFrequency,DownpaymentPct,StartDate
100000,0.05,20,German,monthly,fixed,,,2024-01-15
";
        let err = load_loan_specs_from_reader(book.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
        assert!(err.to_string().contains("German"));
    }
}
