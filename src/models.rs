//! Core data models for monthly finance records

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

//
// ================= Expense Categories =================
//

/// Fixed expense categories, in definition order.
///
/// The order matters: it is the chart ordering and the tie-break order
/// for the largest expense category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Insurance,
    #[serde(rename = "Loan_Payments")]
    LoanPayments,
    Groceries,
    Transportation,
    Entertainment,
    Healthcare,
    Shopping,
    #[serde(rename = "Dining_Out")]
    DiningOut,
    Subscriptions,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 11] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Utilities,
        ExpenseCategory::Insurance,
        ExpenseCategory::LoanPayments,
        ExpenseCategory::Groceries,
        ExpenseCategory::Transportation,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Healthcare,
        ExpenseCategory::Shopping,
        ExpenseCategory::DiningOut,
        ExpenseCategory::Subscriptions,
    ];

    /// CSV header for this category
    pub fn column(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "Rent",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Insurance => "Insurance",
            ExpenseCategory::LoanPayments => "Loan_Payments",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Healthcare => "Healthcare",
            ExpenseCategory::Shopping => "Shopping",
            ExpenseCategory::DiningOut => "Dining_Out",
            ExpenseCategory::Subscriptions => "Subscriptions",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

//
// ================= Month =================
//

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts `YYYY-MM`, or a full `YYYY-MM-DD` date truncated to its month
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("expected YYYY-MM, got {:?}", s);

        // chrono accepts unpadded fields, so check the shape first
        let padded = |shape: &[usize]| {
            let parts: Vec<&str> = s.split('-').collect();
            parts.len() == shape.len()
                && parts
                    .iter()
                    .zip(shape)
                    .all(|(part, len)| part.len() == *len && part.bytes().all(|b| b.is_ascii_digit()))
        };

        let parsed = if padded(&[4, 2]) {
            NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        } else if padded(&[4, 2, 2]) {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
        } else {
            return Err(invalid());
        };
        let date = parsed.map_err(|_| invalid())?;

        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ================= Monthly Record =================
//

/// One month of parsed financial data. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRecord {
    pub month: YearMonth,
    pub income: Decimal,
    /// Amounts indexed by `ExpenseCategory::index`
    pub expenses: [Decimal; 11],
    pub savings: Decimal,
    pub investments: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
}

/// Sum of `values`, or `None` once it leaves the `Decimal` range
pub fn checked_total<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

impl MonthlyRecord {
    /// Build a record whose totals are derived from its parts.
    ///
    /// `None` when the category amounts overflow when added up.
    pub fn derived(
        month: YearMonth,
        income: Decimal,
        expenses: [Decimal; 11],
        savings: Decimal,
        investments: Decimal,
    ) -> Option<Self> {
        let total_expenses = checked_total(expenses)?;
        Some(Self {
            month,
            income,
            expenses,
            savings,
            investments,
            total_expenses,
            net_income: income.checked_sub(total_expenses)?,
        })
    }

    pub fn category_amount(&self, category: ExpenseCategory) -> Decimal {
        self.expenses[category.index()]
    }

    pub fn is_deficit(&self) -> bool {
        self.net_income < Decimal::ZERO
    }
}

//
// ================= Data Quality =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    TotalExpensesMismatch,
    NetIncomeMismatch,
}

/// A supplied total that disagrees with the value derived from its parts.
/// The supplied value is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataQualityWarning {
    pub line: u64,
    pub month: YearMonth,
    pub kind: WarningKind,
    pub supplied: Decimal,
    pub computed: Decimal,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = match self.kind {
            WarningKind::TotalExpensesMismatch => "Total_Expenses",
            WarningKind::NetIncomeMismatch => "Net_Income",
        };
        write!(
            f,
            "line {} ({}): {} is {} but parts give {}",
            self.line, self.month, column, self.supplied, self.computed
        )
    }
}

/// Parser output: records in chronological order plus warnings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedDataset {
    pub records: Vec<MonthlyRecord>,
    pub warnings: Vec<DataQualityWarning>,
}

impl ParsedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
