//! Prompt context builder
//!
//! Serializes summary statistics into a bounded text block for the
//! completion request. Sections are dropped lowest priority first when
//! the text does not fit.

use crate::aggregator::SummaryStatistics;
use crate::error::{InsightError, ValidationError};
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, warn};

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 2000;

/// Response layout requested from the model
const ADVICE_FORMAT: &str = r#"Please provide structured, concise financial advice. Format your response as:

## Key Issues
- List 2-3 main problems

## Immediate Actions
- 3-4 specific steps to take now

## Budget Recommendations
- Specific expense reduction targets
- Income improvement suggestions

## Next Steps
- 2-3 follow-up actions

Keep each section brief and actionable. Use bullet points and be specific with amounts and percentages."#;

/// Context sections, highest priority first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextSection {
    Totals,
    Trend,
    Categories,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptContext {
    pub text: String,
    /// Sections left out to respect the size limit
    pub omitted: Vec<ContextSection>,
}

impl PromptContext {
    pub fn is_truncated(&self) -> bool {
        !self.omitted.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PromptContextBuilder {
    max_chars: usize,
    currency_symbol: String,
}

impl PromptContextBuilder {
    pub fn new(max_chars: usize, currency_symbol: impl Into<String>) -> Self {
        Self {
            max_chars,
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    /// Build the context, dropping category detail before trend detail.
    ///
    /// Fails only when the totals alone exceed the limit.
    pub fn build(&self, summary: &SummaryStatistics) -> Result<PromptContext> {
        let mut sections = vec![
            (ContextSection::Totals, self.totals_section(summary)?),
            (ContextSection::Trend, self.trend_section(summary)),
            (ContextSection::Categories, self.category_section(summary)),
        ];
        let mut omitted = Vec::new();

        loop {
            let text = sections
                .iter()
                .map(|(_, body)| body.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let size = text.chars().count();

            if size <= self.max_chars {
                if !omitted.is_empty() {
                    warn!(
                        size,
                        limit = self.max_chars,
                        omitted = ?omitted,
                        "Prompt context truncated"
                    );
                }
                debug!(size, "Prompt context built");
                return Ok(PromptContext { text, omitted });
            }

            if sections.len() == 1 {
                return Err(InsightError::ContextTooLarge {
                    size,
                    limit: self.max_chars,
                });
            }

            if let Some((section, _)) = sections.pop() {
                omitted.insert(0, section);
            }
        }
    }

    fn totals_section(&self, s: &SummaryStatistics) -> Result<String> {
        let mut out = String::from("Financial Data Summary:\n");
        let _ = writeln!(out, "- Annual Income: {}", self.money(s.total_income));
        let _ = writeln!(out, "- Annual Expenses: {}", self.money(s.total_expenses));
        let _ = writeln!(out, "- Net Income: {}", self.money(s.net_income));
        let _ = writeln!(out, "- Savings: {}", self.money(s.total_savings));
        let _ = writeln!(out, "- Investments: {}", self.money(s.total_investments));
        let _ = writeln!(out, "- Savings Rate: {} of income", percent(s.savings_rate)?);
        let _ = writeln!(out, "- Months in Deficit: {}", s.months_in_deficit);
        let _ = writeln!(out, "- Largest Expense: {}", s.largest_expense_category);
        Ok(out)
    }

    fn trend_section(&self, s: &SummaryStatistics) -> String {
        let mut out = String::from("Monthly Trend:\n");
        let _ = writeln!(
            out,
            "- Period: {} to {} ({} months)",
            s.first_month, s.last_month, s.month_count
        );
        let _ = writeln!(out, "- Average Monthly Income: {}", self.money(s.average_monthly_income));
        let _ = writeln!(out, "- Average Monthly Expenses: {}", self.money(s.average_monthly_expenses));
        let _ = writeln!(out, "- Average Monthly Savings: {}", self.money(s.average_monthly_savings));
        if let Some(delta) = s.net_income_trend_delta {
            let _ = writeln!(out, "- Net Income Change (first to last month): {}", self.money(delta));
        }
        out
    }

    fn category_section(&self, s: &SummaryStatistics) -> String {
        let mut out = String::from("Expenses by Category (total / monthly average):\n");
        for stat in &s.categories {
            let _ = writeln!(
                out,
                "- {}: {} / {}",
                stat.category,
                self.money(stat.total),
                self.money(stat.average)
            );
        }
        out
    }

    fn money(&self, value: Decimal) -> String {
        format_amount(value, &self.currency_symbol)
    }
}

/// Full prompt sent to the completion endpoint
pub fn compose_prompt(context: &PromptContext, question: &str) -> String {
    format!(
        "{}\n{}\n\nUser Question: {}\n\nPlease provide detailed financial advice and recommendations:",
        context.text,
        ADVICE_FORMAT,
        question.trim()
    )
}

/// `1234567.891` → `₹1,234,567.89`
pub fn format_amount(value: Decimal, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value.abs().round_dp(2));
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() && !value.round_dp(2).is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}{}.{}", sign, currency_symbol, grouped, fraction)
}

/// Ratio as a one-decimal percentage
pub fn percent(ratio: Decimal) -> Result<String> {
    let scaled = ratio.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(|| {
        InsightError::from(ValidationError::AmountTooLarge {
            column: "savings rate".to_string(),
        })
    })?;
    Ok(format!("{:.1}%", scaled.round_dp(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::summarize;
    use crate::parser::parse_csv;
    use crate::parser::tests::two_month_csv;
    use rust_decimal_macros::dec;

    fn summary() -> SummaryStatistics {
        let dataset = parse_csv(&two_month_csv()).unwrap();
        summarize(&dataset.records).unwrap()
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(1234567.891), "₹"), "₹1,234,567.89");
        assert_eq!(format_amount(dec!(800), "$"), "$800.00");
        assert_eq!(format_amount(dec!(-1500.5), "₹"), "-₹1,500.50");
        assert_eq!(format_amount(dec!(0), "₹"), "₹0.00");
        assert_eq!(format_amount(dec!(100000), ""), "100,000.00");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(dec!(0.11)).unwrap(), "11.0%");
        assert_eq!(percent(dec!(0.12345)).unwrap(), "12.3%");
        assert!(matches!(
            percent(Decimal::MAX),
            Err(InsightError::Validation(ValidationError::AmountTooLarge { .. }))
        ));
    }

    #[test]
    fn test_full_context_when_it_fits() {
        let context = PromptContextBuilder::new(DEFAULT_MAX_CONTEXT_CHARS, "₹")
            .build(&summary())
            .unwrap();

        assert!(!context.is_truncated());
        assert!(context.text.contains("- Annual Income: ₹10,000.00"));
        assert!(context.text.contains("- Savings Rate: 11.0% of income"));
        assert!(context.text.contains("- Largest Expense: Rent"));
        assert!(context.text.contains("Net Income Change (first to last month): ₹100.00"));
        assert!(context.text.contains("- Dining_Out: ₹600.00 / ₹300.00"));
    }

    #[test]
    fn test_context_is_deterministic() {
        let builder = PromptContextBuilder::new(DEFAULT_MAX_CONTEXT_CHARS, "₹");
        let s = summary();
        assert_eq!(builder.build(&s).unwrap(), builder.build(&s).unwrap());
    }

    #[test]
    fn test_categories_dropped_before_trend() {
        let s = summary();
        let full = PromptContextBuilder::new(usize::MAX, "₹").build(&s).unwrap();
        let without_categories = full
            .text
            .split("Expenses by Category")
            .next()
            .unwrap()
            .trim_end()
            .chars()
            .count();

        let context = PromptContextBuilder::new(without_categories + 1, "₹")
            .build(&s)
            .unwrap();

        assert_eq!(context.omitted, vec![ContextSection::Categories]);
        assert!(context.text.contains("Monthly Trend"));
        assert!(!context.text.contains("Expenses by Category"));
        assert!(context.text.chars().count() <= without_categories + 1);
    }

    #[test]
    fn test_totals_survive_tight_limit() {
        let s = summary();
        let context = PromptContextBuilder::new(400, "₹").build(&s).unwrap();

        assert_eq!(
            context.omitted,
            vec![ContextSection::Trend, ContextSection::Categories]
        );
        assert!(context.text.starts_with("Financial Data Summary:"));
    }

    #[test]
    fn test_too_small_limit_fails() {
        let err = PromptContextBuilder::new(20, "₹").build(&summary()).unwrap_err();
        assert!(matches!(err, InsightError::ContextTooLarge { limit: 20, .. }));
    }

    #[test]
    fn test_compose_prompt_appends_question() {
        let context = PromptContextBuilder::new(DEFAULT_MAX_CONTEXT_CHARS, "₹")
            .build(&summary())
            .unwrap();
        let prompt = compose_prompt(&context, "  How can I cut rent?  ");

        assert!(prompt.starts_with("Financial Data Summary:"));
        assert!(prompt.contains("## Immediate Actions"));
        assert!(prompt.contains("User Question: How can I cut rent?\n"));
    }
}
