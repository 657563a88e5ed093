//! Aggregator
//!
//! Summary statistics over an ordered sequence of monthly records.
//! Deterministic: totals do not depend on row order, and ties for the
//! largest category go to the earlier category.

use crate::error::{InsightError, ValidationError};
use crate::models::{checked_total, ExpenseCategory, MonthlyRecord, YearMonth};
use crate::parser::{INCOME_COLUMN, INVESTMENTS_COLUMN, NET_INCOME_COLUMN, SAVINGS_COLUMN, TOTAL_EXPENSES_COLUMN};
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryStatistic {
    pub category: ExpenseCategory,
    pub total: Decimal,
    pub average: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryStatistics {
    pub month_count: usize,
    pub first_month: YearMonth,
    pub last_month: YearMonth,

    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_savings: Decimal,
    pub total_investments: Decimal,
    /// total income minus total expenses
    pub net_income: Decimal,

    pub average_monthly_income: Decimal,
    pub average_monthly_expenses: Decimal,
    pub average_monthly_savings: Decimal,
    pub average_monthly_net_income: Decimal,

    /// In category-definition order
    pub categories: Vec<CategoryStatistic>,
    pub largest_expense_category: ExpenseCategory,

    /// total savings / total income, zero when there is no income
    pub savings_rate: Decimal,
    /// total savings / net income while net income is positive, else zero
    pub net_savings_rate: Decimal,
    pub months_in_deficit: usize,

    /// Last month's net income minus the first month's; needs two months
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income_trend_delta: Option<Decimal>,
}

impl SummaryStatistics {
    pub fn category(&self, category: ExpenseCategory) -> Option<&CategoryStatistic> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn category_total(&self, category: ExpenseCategory) -> Decimal {
        self.category(category)
            .map(|c| c.total)
            .unwrap_or(Decimal::ZERO)
    }
}

fn too_large(column: &str) -> InsightError {
    InsightError::from(ValidationError::AmountTooLarge {
        column: column.to_string(),
    })
}

/// Total of one field across all records
fn column_total(
    records: &[MonthlyRecord],
    column: &str,
    value: impl Fn(&MonthlyRecord) -> Decimal,
) -> Result<Decimal> {
    checked_total(records.iter().map(value)).ok_or_else(|| too_large(column))
}

/// Per-category totals in category-definition order
pub fn category_totals(records: &[MonthlyRecord]) -> Result<[Decimal; 11]> {
    let mut totals = [Decimal::ZERO; 11];
    for category in ExpenseCategory::ALL {
        totals[category.index()] =
            column_total(records, category.column(), |r| r.category_amount(category))?;
    }
    Ok(totals)
}

/// First category holding the maximum total
fn largest_category(totals: &[Decimal; 11]) -> ExpenseCategory {
    let mut largest = ExpenseCategory::ALL[0];
    for category in ExpenseCategory::ALL.iter().skip(1) {
        if totals[category.index()] > totals[largest.index()] {
            largest = *category;
        }
    }
    largest
}

fn ratio(numerator: Decimal, denominator: Decimal, name: &str) -> Result<Decimal> {
    numerator
        .checked_div(denominator)
        .ok_or_else(|| too_large(name))
}

/// Compute summary statistics. Records are expected in chronological order.
///
/// Totals that leave the `Decimal` range fail with `AmountTooLarge`.
pub fn summarize(records: &[MonthlyRecord]) -> Result<SummaryStatistics> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(InsightError::EmptyDataset),
    };

    let months = Decimal::from(records.len());

    let total_income = column_total(records, INCOME_COLUMN, |r| r.income)?;
    let total_expenses = column_total(records, TOTAL_EXPENSES_COLUMN, |r| r.total_expenses)?;
    let total_savings = column_total(records, SAVINGS_COLUMN, |r| r.savings)?;
    let total_investments = column_total(records, INVESTMENTS_COLUMN, |r| r.investments)?;
    let total_net = column_total(records, NET_INCOME_COLUMN, |r| r.net_income)?;
    let net_income = total_income
        .checked_sub(total_expenses)
        .ok_or_else(|| too_large(NET_INCOME_COLUMN))?;

    let totals = category_totals(records)?;
    let categories = ExpenseCategory::ALL
        .iter()
        .map(|category| CategoryStatistic {
            category: *category,
            total: totals[category.index()],
            average: totals[category.index()] / months,
        })
        .collect();

    let savings_rate = if total_income.is_zero() {
        Decimal::ZERO
    } else {
        ratio(total_savings, total_income, "savings rate")?
    };

    let net_savings_rate = if net_income > Decimal::ZERO {
        ratio(total_savings, net_income, "net savings rate")?
    } else {
        Decimal::ZERO
    };

    let net_income_trend_delta = if records.len() >= 2 {
        let delta = last
            .net_income
            .checked_sub(first.net_income)
            .ok_or_else(|| too_large(NET_INCOME_COLUMN))?;
        Some(delta)
    } else {
        None
    };

    let summary = SummaryStatistics {
        month_count: records.len(),
        first_month: first.month,
        last_month: last.month,
        total_income,
        total_expenses,
        total_savings,
        total_investments,
        net_income,
        average_monthly_income: total_income / months,
        average_monthly_expenses: total_expenses / months,
        average_monthly_savings: total_savings / months,
        average_monthly_net_income: total_net / months,
        categories,
        largest_expense_category: largest_category(&totals),
        savings_rate,
        net_savings_rate,
        months_in_deficit: records.iter().filter(|r| r.is_deficit()).count(),
        net_income_trend_delta,
    };

    info!(
        months = summary.month_count,
        largest_expense = %summary.largest_expense_category,
        months_in_deficit = summary.months_in_deficit,
        "Aggregated financial summary"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv;
    use crate::parser::tests::two_month_csv;
    use rust_decimal_macros::dec;

    fn record(month: &str, income: Decimal, expenses: [Decimal; 11], savings: Decimal) -> MonthlyRecord {
        MonthlyRecord::derived(month.parse().unwrap(), income, expenses, savings, Decimal::ZERO).unwrap()
    }

    fn expenses_with(pairs: &[(ExpenseCategory, Decimal)]) -> [Decimal; 11] {
        let mut expenses = [Decimal::ZERO; 11];
        for (category, amount) in pairs {
            expenses[category.index()] = *amount;
        }
        expenses
    }

    #[test]
    fn test_end_to_end_example() {
        let dataset = parse_csv(&two_month_csv()).unwrap();
        let summary = summarize(&dataset.records).unwrap();

        assert_eq!(summary.net_income_trend_delta, Some(dec!(100)));
        assert_eq!(summary.savings_rate, dec!(0.11));
        assert_eq!(summary.total_income, dec!(10000));
        assert_eq!(summary.total_expenses, dec!(8300));
        assert_eq!(summary.net_income, dec!(1700));
        assert_eq!(summary.month_count, 2);
        assert_eq!(summary.first_month.to_string(), "2024-01");
        assert_eq!(summary.largest_expense_category, ExpenseCategory::Rent);
        assert_eq!(summary.category_total(ExpenseCategory::Rent), dec!(2400));
        assert_eq!(summary.category(ExpenseCategory::Rent).unwrap().average, dec!(1200));
    }

    #[test]
    fn test_empty_dataset_fails() {
        assert!(matches!(summarize(&[]), Err(InsightError::EmptyDataset)));
    }

    #[test]
    fn test_zero_income_gives_zero_savings_rate() {
        let records = vec![record("2024-01", dec!(0), [Decimal::ZERO; 11], dec!(50))];
        let summary = summarize(&records).unwrap();

        assert_eq!(summary.savings_rate, Decimal::ZERO);
        assert_eq!(summary.net_savings_rate, Decimal::ZERO);
    }

    #[test]
    fn test_savings_rate_may_exceed_one() {
        let records = vec![record("2024-01", dec!(100), [Decimal::ZERO; 11], dec!(150))];
        let summary = summarize(&records).unwrap();

        assert_eq!(summary.savings_rate, dec!(1.5));
    }

    #[test]
    fn test_single_month_has_no_trend() {
        let records = vec![record("2024-01", dec!(100), [Decimal::ZERO; 11], dec!(0))];
        let summary = summarize(&records).unwrap();

        assert_eq!(summary.net_income_trend_delta, None);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("net_income_trend_delta").is_none());
    }

    #[test]
    fn test_largest_category_tie_goes_to_earlier_category() {
        let expenses = expenses_with(&[
            (ExpenseCategory::Shopping, dec!(500)),
            (ExpenseCategory::Groceries, dec!(500)),
            (ExpenseCategory::Subscriptions, dec!(10)),
        ]);
        let records = vec![record("2024-01", dec!(2000), expenses, dec!(0))];

        let summary = summarize(&records).unwrap();
        assert_eq!(summary.largest_expense_category, ExpenseCategory::Groceries);
    }

    #[test]
    fn test_all_zero_expenses_pick_first_category() {
        let records = vec![record("2024-01", dec!(10), [Decimal::ZERO; 11], dec!(0))];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.largest_expense_category, ExpenseCategory::Rent);
    }

    #[test]
    fn test_totals_independent_of_row_order() {
        let records = vec![
            record("2024-01", dec!(3000), expenses_with(&[(ExpenseCategory::Rent, dec!(1000.25))]), dec!(10)),
            record("2024-02", dec!(3100), expenses_with(&[(ExpenseCategory::Healthcare, dec!(80))]), dec!(20)),
            record("2024-03", dec!(2900), expenses_with(&[(ExpenseCategory::Rent, dec!(999.75))]), dec!(30)),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = summarize(&records).unwrap();
        let backward = summarize(&reversed).unwrap();

        assert_eq!(forward.categories, backward.categories);
        assert_eq!(forward.total_income, backward.total_income);
        assert_eq!(forward.total_savings, backward.total_savings);
        assert_eq!(forward.category_total(ExpenseCategory::Rent), dec!(2000));
    }

    #[test]
    fn test_months_in_deficit_and_net_savings_rate() {
        let records = vec![
            record("2024-01", dec!(1000), expenses_with(&[(ExpenseCategory::Rent, dec!(1500))]), dec!(0)),
            record("2024-02", dec!(3000), expenses_with(&[(ExpenseCategory::Rent, dec!(500))]), dec!(500)),
        ];
        let summary = summarize(&records).unwrap();

        assert_eq!(summary.months_in_deficit, 1);
        assert_eq!(summary.net_income, dec!(2000));
        assert_eq!(summary.net_savings_rate, dec!(0.25));
        assert_eq!(summary.net_income_trend_delta, Some(dec!(3000)));
    }

    fn amount_too_large(err: InsightError) -> String {
        match err {
            InsightError::Validation(ValidationError::AmountTooLarge { column }) => column,
            other => panic!("expected AmountTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_income_total_is_an_error() {
        let records = vec![
            record("2024-01", Decimal::MAX, [Decimal::ZERO; 11], dec!(0)),
            record("2024-02", Decimal::MAX, [Decimal::ZERO; 11], dec!(0)),
        ];

        assert_eq!(amount_too_large(summarize(&records).unwrap_err()), "Income");
    }

    #[test]
    fn test_overflowing_category_total_is_an_error() {
        let rent = expenses_with(&[(ExpenseCategory::Rent, Decimal::MAX)]);
        let records = vec![
            record("2024-01", dec!(0), rent, dec!(0)),
            record("2024-02", dec!(0), rent, dec!(0)),
        ];

        assert!(matches!(
            category_totals(&records),
            Err(InsightError::Validation(ValidationError::AmountTooLarge { .. }))
        ));
    }

    #[test]
    fn test_unrepresentable_savings_rate_is_an_error() {
        let records = vec![record("2024-01", dec!(0.01), [Decimal::ZERO; 11], dec!(79000000000000000000000000000))];

        assert_eq!(amount_too_large(summarize(&records).unwrap_err()), "savings rate");
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let dataset = parse_csv(&two_month_csv()).unwrap();
        let summary = summarize(&dataset.records).unwrap();

        let json = serde_json::to_string(&summary).unwrap();
        let back: SummaryStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.largest_expense_category, summary.largest_expense_category);
        assert_eq!(back.month_count, 2);
    }
}
