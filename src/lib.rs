//! Financial Insight
//!
//! Turns a monthly personal-finance CSV into:
//! - Typed, validated monthly records
//! - Summary statistics (totals, averages, savings rate, trend)
//! - Plotly-ready chart payloads
//! - A bounded prompt context for the Gemini-backed financial assistant
//!
//! PIPELINE:
//! CSV → PARSE → AGGREGATE → { CHARTS, PROMPT CONTEXT → ADVISOR }

pub mod advisor;
pub mod aggregator;
pub mod api;
pub mod charts;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;

pub use error::{InsightError, Result, ValidationError};

// Re-export common types
pub use models::*;
pub use aggregator::{summarize, SummaryStatistics};
pub use charts::{ChartBuilder, ChartPayload, ChartSet};
pub use parser::parse_csv;
pub use pipeline::{analyze, Analysis};
pub use prompt::{PromptContext, PromptContextBuilder};
