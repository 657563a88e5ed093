use financial_insight::{
    advisor::{CompletionProvider, FinancialAdvisor},
    analyze,
    config::AppConfig,
    gemini::GeminiClient,
    prompt::{format_amount, percent},
    ChartBuilder, PromptContextBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Usage: report [CSV_PATH] [--ask QUESTION]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (RUST_LOG=info shows progress)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let mut path: Option<PathBuf> = None;
    let mut question: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ask" => question = args.next(),
            _ => path = Some(PathBuf::from(arg)),
        }
    }
    let path = path.unwrap_or_else(|| config.sample_data_path.clone());

    info!(path = %path.display(), "Analyzing CSV");
    let csv = std::fs::read_to_string(&path)?;
    let analysis = analyze(&csv, &ChartBuilder::new(config.currency_symbol.clone()))?;
    let summary = &analysis.summary;
    let money = |v| format_amount(v, &config.currency_symbol);

    println!("\n=== FINANCIAL SUMMARY ({} months, {} to {}) ===", summary.month_count, summary.first_month, summary.last_month);
    println!("Income:        {}", money(summary.total_income));
    println!("Expenses:      {}", money(summary.total_expenses));
    println!("Net income:    {}", money(summary.net_income));
    println!("Savings rate:  {}", percent(summary.savings_rate)?);
    println!("Deficit months: {}", summary.months_in_deficit);
    println!("Largest expense: {}", summary.largest_expense_category);
    if let Some(delta) = summary.net_income_trend_delta {
        println!("Net income change: {}", money(delta));
    }

    if !analysis.warnings.is_empty() {
        println!("\nData quality warnings:");
        for (i, warning) in analysis.warnings.iter().enumerate() {
            println!("  {}: {}", i + 1, warning);
        }
    }

    let context_builder = PromptContextBuilder::new(
        config.prompt_context_max_chars,
        config.currency_symbol.clone(),
    );

    let Some(question) = question else {
        let context = context_builder.build(summary)?;
        println!("\n=== PROMPT CONTEXT ===\n{}", context.text);
        return Ok(());
    };

    let provider: Option<Arc<dyn CompletionProvider>> = match &config.gemini {
        Some(gemini) => Some(Arc::new(GeminiClient::new(gemini.clone())?)),
        None => None,
    };
    let advisor = FinancialAdvisor::new(provider, context_builder, config.advisor_fallback);

    match advisor.advise(summary, &question).await {
        Ok(advice) => {
            println!("\n=== ADVICE ({:?}) ===\n{}", advice.source, advice.answer);
            Ok(())
        }
        Err(e) => {
            eprintln!("Advice unavailable: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
