//! Chart data builder
//!
//! Maps records and summary statistics onto Plotly's declarative JSON
//! schema (`{ data, layout }`). Series keep chronological or category
//! order and are never re-sorted by value.

use crate::aggregator::SummaryStatistics;
use crate::models::{ExpenseCategory, MonthlyRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const INCOME_COLOR: &str = "#2E8B57";
const SAVINGS_COLOR: &str = "#4169E1";
const INVESTMENTS_COLOR: &str = "#FF6347";
const NET_INCOME_COLOR: &str = "#32CD32";
const TEMPLATE: &str = "plotly_white";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    IncomeTrend,
    ExpenseBreakdown,
    MonthlyExpenses,
    SavingsAnalysis,
    NetIncomeTrend,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceType {
    Scatter,
    Pie,
    Bar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

/// One Plotly trace. Only the fields a given trace type uses are set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    #[serde(rename = "type")]
    pub trace_type: TraceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

impl Trace {
    fn line_series(name: &str, x: Vec<String>, y: Vec<f64>, color: &str) -> Self {
        Self {
            trace_type: TraceType::Scatter,
            name: Some(name.to_string()),
            x: Some(x),
            y: Some(y),
            labels: None,
            values: None,
            mode: Some("lines+markers".to_string()),
            hole: None,
            fill: None,
            line: Some(Line {
                color: Some(color.to_string()),
                width: Some(3),
                dash: None,
            }),
        }
    }

    fn bar(name: &str, x: Vec<String>, y: Vec<f64>) -> Self {
        Self {
            trace_type: TraceType::Bar,
            name: Some(name.to_string()),
            x: Some(x),
            y: Some(y),
            labels: None,
            values: None,
            mode: None,
            hole: None,
            fill: None,
            line: None,
        }
    }

    fn pie(labels: Vec<String>, values: Vec<f64>) -> Self {
        Self {
            trace_type: TraceType::Pie,
            name: None,
            x: None,
            y: None,
            labels: Some(labels),
            values: Some(values),
            mode: None,
            hole: Some(0.3),
            fill: None,
            line: None,
        }
    }

    /// Number of points in the trace
    pub fn len(&self) -> usize {
        self.y
            .as_ref()
            .or(self.values.as_ref())
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisTitle {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Axis {
    pub title: AxisTitle,
}

/// Horizontal reference line spanning the plot width
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: String,
    pub xref: String,
    pub x0: f64,
    pub x1: f64,
    pub yref: String,
    pub y0: f64,
    pub y1: f64,
    pub line: Line,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub text: String,
    pub xref: String,
    pub x: f64,
    pub yref: String,
    pub y: f64,
    pub showarrow: bool,
    pub xanchor: String,
    pub yanchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    pub template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// A single visualization ready for `Plotly.newPlot(el, data, layout)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPayload {
    pub kind: ChartKind,
    pub data: Vec<Trace>,
    pub layout: Layout,
}

/// The five charts rendered for every analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSet {
    pub income_trend: ChartPayload,
    pub expense_breakdown: ChartPayload,
    pub monthly_expenses: ChartPayload,
    pub savings_analysis: ChartPayload,
    pub net_income_trend: ChartPayload,
}

impl ChartSet {
    pub fn payloads(&self) -> [&ChartPayload; 5] {
        [
            &self.income_trend,
            &self.expense_breakdown,
            &self.monthly_expenses,
            &self.savings_analysis,
            &self.net_income_trend,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ChartBuilder {
    currency_symbol: String,
}

impl ChartBuilder {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Build all five charts.
    ///
    /// The expense breakdown uses the summary's category totals when given,
    /// otherwise it totals the records itself.
    pub fn build(&self, records: &[MonthlyRecord], summary: Option<&SummaryStatistics>) -> ChartSet {
        ChartSet {
            income_trend: self.income_trend(records),
            expense_breakdown: self.expense_breakdown(records, summary),
            monthly_expenses: self.monthly_expenses(records),
            savings_analysis: self.savings_analysis(records),
            net_income_trend: self.net_income_trend(records),
        }
    }

    pub fn income_trend(&self, records: &[MonthlyRecord]) -> ChartPayload {
        ChartPayload {
            kind: ChartKind::IncomeTrend,
            data: vec![Trace::line_series(
                "Income",
                months(records),
                series(records, |r| r.income),
                INCOME_COLOR,
            )],
            layout: self.time_layout("Monthly Income Trend"),
        }
    }

    pub fn expense_breakdown(
        &self,
        records: &[MonthlyRecord],
        summary: Option<&SummaryStatistics>,
    ) -> ChartPayload {
        let trace = if records.is_empty() {
            Trace::pie(Vec::new(), Vec::new())
        } else {
            let values = ExpenseCategory::ALL
                .iter()
                .map(|category| match summary {
                    Some(summary) => to_f64(&summary.category_total(*category)),
                    // plotting precision only, so f64 sums are enough
                    None => records
                        .iter()
                        .map(|r| to_f64(&r.category_amount(*category)))
                        .sum::<f64>(),
                })
                .collect::<Vec<f64>>();

            Trace::pie(
                ExpenseCategory::ALL.iter().map(|c| c.column().to_string()).collect(),
                values,
            )
        };

        ChartPayload {
            kind: ChartKind::ExpenseBreakdown,
            data: vec![trace],
            layout: Layout {
                title: "Annual Expense Breakdown".to_string(),
                xaxis: None,
                yaxis: None,
                barmode: None,
                template: TEMPLATE.to_string(),
                shapes: Vec::new(),
                annotations: Vec::new(),
            },
        }
    }

    pub fn monthly_expenses(&self, records: &[MonthlyRecord]) -> ChartPayload {
        let x = months(records);
        let data = ExpenseCategory::ALL
            .iter()
            .map(|category| {
                Trace::bar(
                    category.column(),
                    x.clone(),
                    series(records, |r| r.category_amount(*category)),
                )
            })
            .collect();

        let mut layout = self.time_layout("Monthly Expenses by Category");
        layout.barmode = Some("stack".to_string());

        ChartPayload {
            kind: ChartKind::MonthlyExpenses,
            data,
            layout,
        }
    }

    pub fn savings_analysis(&self, records: &[MonthlyRecord]) -> ChartPayload {
        let x = months(records);
        ChartPayload {
            kind: ChartKind::SavingsAnalysis,
            data: vec![
                Trace::line_series("Savings", x.clone(), series(records, |r| r.savings), SAVINGS_COLOR),
                Trace::line_series(
                    "Investments",
                    x,
                    series(records, |r| r.investments),
                    INVESTMENTS_COLOR,
                ),
            ],
            layout: self.time_layout("Savings and Investments Trend"),
        }
    }

    pub fn net_income_trend(&self, records: &[MonthlyRecord]) -> ChartPayload {
        let mut trace = Trace::line_series(
            "Net Income",
            months(records),
            series(records, |r| r.net_income),
            NET_INCOME_COLOR,
        );
        trace.fill = Some("tonexty".to_string());

        let mut layout = self.time_layout("Monthly Net Income Trend");
        layout.shapes.push(Shape {
            shape_type: "line".to_string(),
            xref: "paper".to_string(),
            x0: 0.0,
            x1: 1.0,
            yref: "y".to_string(),
            y0: 0.0,
            y1: 0.0,
            line: Line {
                color: Some("red".to_string()),
                width: None,
                dash: Some("dash".to_string()),
            },
        });
        layout.annotations.push(Annotation {
            text: "Break-even Line".to_string(),
            xref: "paper".to_string(),
            x: 1.0,
            yref: "y".to_string(),
            y: 0.0,
            showarrow: false,
            xanchor: "right".to_string(),
            yanchor: "bottom".to_string(),
        });

        ChartPayload {
            kind: ChartKind::NetIncomeTrend,
            data: vec![trace],
            layout,
        }
    }

    fn time_layout(&self, title: &str) -> Layout {
        Layout {
            title: title.to_string(),
            xaxis: Some(Axis {
                title: AxisTitle {
                    text: "Month".to_string(),
                },
            }),
            yaxis: Some(Axis {
                title: AxisTitle {
                    text: format!("Amount ({})", self.currency_symbol),
                },
            }),
            barmode: None,
            template: TEMPLATE.to_string(),
            shapes: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

fn months(records: &[MonthlyRecord]) -> Vec<String> {
    records.iter().map(|r| r.month.to_string()).collect()
}

fn series(records: &[MonthlyRecord], value: impl Fn(&MonthlyRecord) -> Decimal) -> Vec<f64> {
    records.iter().map(|r| to_f64(&value(r))).collect()
}

fn to_f64(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
