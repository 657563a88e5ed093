//! Financial assistant
//!
//! Answers free-text questions about an analyzed dataset by forwarding
//! the prompt context and question to a completion provider. Failures
//! stay inside the chat feature; analysis never depends on it.

use crate::aggregator::SummaryStatistics;
use crate::error::InsightError;
use crate::prompt::{compose_prompt, format_amount, PromptContextBuilder};
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Text returned by a completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub confidence: f32,
}

/// Outbound text-completion service
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, prompt: &str) -> Result<Completion>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdviceSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    pub answer: String,
    pub source: AdviceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub confidence: f32,
    pub context_truncated: bool,
}

pub struct FinancialAdvisor {
    provider: Option<Arc<dyn CompletionProvider>>,
    context_builder: PromptContextBuilder,
    fallback_enabled: bool,
}

impl FinancialAdvisor {
    pub fn new(
        provider: Option<Arc<dyn CompletionProvider>>,
        context_builder: PromptContextBuilder,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            provider,
            context_builder,
            fallback_enabled,
        }
    }

    /// False when no API key was configured
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn advise(&self, summary: &SummaryStatistics, question: &str) -> Result<AdviceResponse> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            InsightError::FeatureUnavailable(
                "the financial assistant is disabled because GEMINI_API_KEY is not configured"
                    .to_string(),
            )
        })?;

        if question.trim().is_empty() {
            return Err(InsightError::InvalidRequest("No question provided".to_string()));
        }

        let context = self.context_builder.build(summary)?;
        let prompt = compose_prompt(&context, question);

        match provider.complete(&prompt).await {
            Ok(completion) => {
                info!(
                    provider = provider.name(),
                    model = %completion.model,
                    confidence = completion.confidence,
                    "Advice generated"
                );
                Ok(AdviceResponse {
                    answer: completion.text,
                    source: AdviceSource::Model,
                    model: Some(completion.model),
                    confidence: completion.confidence,
                    context_truncated: context.is_truncated(),
                })
            }
            Err(InsightError::ExternalService(reason)) if self.fallback_enabled => {
                warn!(
                    provider = provider.name(),
                    "Completion service unavailable, answering with basic guidance: {}",
                    reason
                );
                Ok(AdviceResponse {
                    answer: fallback_advice(summary, self.context_builder.currency_symbol()),
                    source: AdviceSource::Fallback,
                    model: None,
                    confidence: 0.5,
                    context_truncated: context.is_truncated(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Rule-based guidance derived from the summary alone
pub fn fallback_advice(summary: &SummaryStatistics, currency_symbol: &str) -> String {
    let largest = summary.largest_expense_category;
    let shortfall = summary.net_income.abs();

    let standing = if summary.net_income < Decimal::ZERO {
        format!(
            "Spending {} more than you earn over the period",
            format_amount(shortfall, currency_symbol)
        )
    } else {
        "Living within your means".to_string()
    };

    let target = format_amount(
        shortfall.saturating_add(Decimal::from(10_000)).round_dp(0),
        currency_symbol,
    );
    let target = target.strip_suffix(".00").unwrap_or(&target);

    format!(
        "## Key Issues\n\
         - {standing}\n\
         - {deficit} months in deficit spending\n\
         - Largest expense: {largest}\n\
         \n\
         ## Immediate Actions\n\
         - Reduce {largest} expenses by 15-20%\n\
         - Create a detailed monthly budget\n\
         - Track every expense for 30 days\n\
         - Look for ways to increase income\n\
         \n\
         ## Budget Recommendations\n\
         - Target: Reduce expenses by {target} annually\n\
         - Focus on: {largest} optimization\n\
         - Build emergency fund: 3-6 months expenses\n\
         \n\
         ## Next Steps\n\
         - Set up expense tracking\n\
         - Review and negotiate {largest} costs\n\
         - Explore additional income sources\n\
         \n\
         *Note: AI service temporarily unavailable. This is basic guidance based on your data.*",
        deficit = summary.months_in_deficit,
    )
}
