//! Analysis pipeline
//!
//! CSV → records → summary → charts, for a single request.

use crate::aggregator::{summarize, SummaryStatistics};
use crate::charts::{ChartBuilder, ChartSet};
use crate::models::DataQualityWarning;
use crate::parser::parse_csv;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Everything the dashboard renders for one upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub rows: usize,
    pub summary: SummaryStatistics,
    pub charts: ChartSet,
    pub warnings: Vec<String>,
}

/// Parse and summarize; any error aborts the whole analysis
pub fn analyze(csv: &str, charts: &ChartBuilder) -> Result<Analysis> {
    let dataset = parse_csv(csv)?;
    let summary = summarize(&dataset.records)?;
    let chart_set = charts.build(&dataset.records, Some(&summary));

    Ok(Analysis {
        rows: dataset.len(),
        summary,
        charts: chart_set,
        warnings: dataset.warnings.iter().map(DataQualityWarning::to_string).collect(),
    })
}

/// Summary only, for chat requests that carry raw CSV
pub fn summarize_csv(csv: &str) -> Result<SummaryStatistics> {
    let dataset = parse_csv(csv)?;
    summarize(&dataset.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InsightError, ValidationError};
    use crate::parser::tests::{two_month_csv, HEADER};
    use rust_decimal_macros::dec;

    #[test]
    fn test_analyze_two_months() {
        let analysis = analyze(&two_month_csv(), &ChartBuilder::new("₹")).unwrap();

        assert_eq!(analysis.rows, 2);
        assert_eq!(analysis.summary.savings_rate, dec!(0.11));
        assert_eq!(analysis.charts.income_trend.data[0].len(), 2);
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let err = analyze(&format!("{}\n", HEADER), &ChartBuilder::new("₹")).unwrap_err();
        assert!(matches!(err, InsightError::EmptyDataset));
    }

    #[test]
    fn test_warnings_are_reported() {
        let csv = format!(
            "{}\n2024-01,3000,1000,100,100,100,100,100,100,100,100,100,100,200,100,2500,500\n",
            HEADER
        );
        let analysis = analyze(&csv, &ChartBuilder::new("₹")).unwrap();

        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("Total_Expenses"));
    }

    #[test]
    fn test_oversized_amounts_fail_without_panicking() {
        let row = "79228162514264337593543950335,0,0,0,0,0,0,0,0,0,0,0,0,0,0,79228162514264337593543950335";
        let csv = format!("{}\n2024-01,{}\n2024-02,{}\n", HEADER, row, row);

        let err = analyze(&csv, &ChartBuilder::new("₹")).unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(
            err,
            InsightError::Validation(ValidationError::AmountTooLarge { .. })
        ));
    }
}
