//! Record parser
//!
//! Turns uploaded CSV text into typed `MonthlyRecord`s, validated once.
//! Total_Expenses and Net_Income are optional: when absent they are derived,
//! when present they are kept even if they disagree with the parts.

use crate::error::{InsightError, ValidationError};
use crate::models::{
    DataQualityWarning, ExpenseCategory, MonthlyRecord, ParsedDataset, WarningKind, YearMonth,
};
use crate::Result;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, warn};

pub const MONTH_COLUMN: &str = "Month";
pub const INCOME_COLUMN: &str = "Income";
pub const SAVINGS_COLUMN: &str = "Savings";
pub const INVESTMENTS_COLUMN: &str = "Investments";
pub const TOTAL_EXPENSES_COLUMN: &str = "Total_Expenses";
pub const NET_INCOME_COLUMN: &str = "Net_Income";

/// Supplied totals may differ from derived ones by rounding
const MISMATCH_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Resolved header positions
struct ColumnLayout {
    month: usize,
    income: usize,
    expenses: [usize; 11],
    savings: usize,
    investments: usize,
    total_expenses: Option<usize>,
    net_income: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> std::result::Result<Self, ValidationError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| ValidationError::MissingColumn {
                column: name.to_string(),
            })
        };

        let month = require(MONTH_COLUMN)?;
        let income = require(INCOME_COLUMN)?;

        let mut expenses = [0usize; 11];
        for category in ExpenseCategory::ALL {
            expenses[category.index()] = require(category.column())?;
        }

        Ok(Self {
            month,
            income,
            expenses,
            savings: require(SAVINGS_COLUMN)?,
            investments: require(INVESTMENTS_COLUMN)?,
            total_expenses: find(TOTAL_EXPENSES_COLUMN),
            net_income: find(NET_INCOME_COLUMN),
        })
    }
}

/// Parse CSV text into records sorted by month.
///
/// Any invalid row fails the whole parse.
pub fn parse_csv(input: &str) -> Result<ParsedDataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    let mut dataset = ParsedDataset::default();

    for row in reader.records() {
        let row = row.map_err(|e| {
            if let csv::ErrorKind::UnequalLengths { pos, expected_len, len } = e.kind() {
                return InsightError::from(ValidationError::MalformedRow {
                    line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
                    reason: format!("expected {} fields, found {}", expected_len, len),
                });
            }
            InsightError::from(e)
        })?;

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let (record, warnings) = parse_row(&row, &layout, line)?;
        dataset.records.push(record);
        dataset.warnings.extend(warnings);
    }

    // stable: equal months keep input order
    dataset.records.sort_by_key(|r| r.month);

    for warning in &dataset.warnings {
        warn!(%warning, "Supplied total disagrees with its parts; keeping supplied value");
    }

    info!(
        rows = dataset.records.len(),
        warnings = dataset.warnings.len(),
        derived_totals = layout.total_expenses.is_none() || layout.net_income.is_none(),
        "Parsed financial CSV"
    );

    Ok(dataset)
}

fn parse_row(
    row: &StringRecord,
    layout: &ColumnLayout,
    line: u64,
) -> std::result::Result<(MonthlyRecord, Vec<DataQualityWarning>), ValidationError> {
    let cell = |index: usize| row.get(index).unwrap_or("");

    let month_raw = cell(layout.month);
    let month = YearMonth::from_str(month_raw).map_err(|reason| ValidationError::InvalidValue {
        column: MONTH_COLUMN.to_string(),
        line,
        value: month_raw.to_string(),
        reason,
    })?;

    let income = parse_amount(cell(layout.income), INCOME_COLUMN, line)?;

    let mut expenses = [Decimal::ZERO; 11];
    for category in ExpenseCategory::ALL {
        let index = layout.expenses[category.index()];
        expenses[category.index()] = parse_amount(cell(index), category.column(), line)?;
    }

    let savings = parse_amount(cell(layout.savings), SAVINGS_COLUMN, line)?;
    let investments = parse_amount(cell(layout.investments), INVESTMENTS_COLUMN, line)?;

    let mut record = MonthlyRecord::derived(month, income, expenses, savings, investments)
        .ok_or_else(|| ValidationError::InvalidValue {
            column: TOTAL_EXPENSES_COLUMN.to_string(),
            line,
            value: String::new(),
            reason: "amount too large".to_string(),
        })?;
    let mut warnings = Vec::new();

    let supplied_total = optional_cell(row, layout.total_expenses)
        .map(|raw| parse_amount(raw, TOTAL_EXPENSES_COLUMN, line))
        .transpose()?;
    if let Some(supplied) = supplied_total {
        if (supplied - record.total_expenses).abs() > MISMATCH_TOLERANCE {
            warnings.push(DataQualityWarning {
                line,
                month,
                kind: WarningKind::TotalExpensesMismatch,
                supplied,
                computed: record.total_expenses,
            });
        }
        record.total_expenses = supplied;
        record.net_income = income - supplied;
    }

    let supplied_net = optional_cell(row, layout.net_income)
        .map(|raw| parse_signed(raw, NET_INCOME_COLUMN, line))
        .transpose()?;
    if let Some(supplied) = supplied_net {
        let differs = supplied
            .checked_sub(record.net_income)
            .map_or(true, |diff| diff.abs() > MISMATCH_TOLERANCE);
        if differs {
            warnings.push(DataQualityWarning {
                line,
                month,
                kind: WarningKind::NetIncomeMismatch,
                supplied,
                computed: record.net_income,
            });
        }
        record.net_income = supplied;
    }

    Ok((record, warnings))
}

/// A present, non-empty optional cell
fn optional_cell(row: &StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| row.get(i))
        .filter(|raw| !raw.is_empty())
}

fn parse_signed(raw: &str, column: &str, line: u64) -> std::result::Result<Decimal, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidValue {
        column: column.to_string(),
        line,
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid("value is empty"));
    }

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| invalid("not a decimal number"))
}

fn parse_amount(raw: &str, column: &str, line: u64) -> std::result::Result<Decimal, ValidationError> {
    let value = parse_signed(raw, column, line)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::InvalidValue {
            column: column.to_string(),
            line,
            value: raw.to_string(),
            reason: "amount must not be negative".to_string(),
        });
    }
    Ok(value)
}
