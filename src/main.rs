mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use viralscope::config::ScoringConfig;
use viralscope::experiment::{ScoringMethod, TracingSink, VariantAssigner};
use viralscope::scoring::{DegradeReason, FormulaScorer, HybridScorer, SubScore};
use viralscope::{format_float, format_number, potential_label, VideoMetrics};

#[derive(Parser)]
#[command(name = "viralscope", about = "Short-form video viral score engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a single video from its metrics
    Score(ScoreArgs),
    /// Show the variant distribution for a synthetic cohort
    Variants(VariantArgs),
    /// Run the scoring API server
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
struct ScoreArgs {
    #[arg(long)]
    views: u64,
    #[arg(long, default_value_t = 0)]
    likes: u64,
    #[arg(long, default_value_t = 0)]
    comments: u64,
    #[arg(long, default_value_t = 0)]
    shares: u64,
    #[arg(long)]
    watch_time: Option<f64>,
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    followers: Option<u64>,
    /// Upload timestamp, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    uploaded: Option<String>,
    /// Pre-computed generative-AI viral score (0-100)
    #[arg(long)]
    gemini_score: Option<f64>,
    #[arg(long, default_value = "cli")]
    user_id: String,
    /// Force a strategy (ml, gemini, formula, hybrid) instead of the A/B
    /// assignment
    #[arg(long)]
    method: Option<String>,
    #[arg(long)]
    no_ml: bool,
    #[arg(long)]
    breakdown: bool,
}

#[derive(Args, Debug, Clone)]
struct VariantArgs {
    #[arg(long, default_value_t = 1000)]
    cohort: usize,
    #[arg(long)]
    test_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Command::Score(args) => run_score(args).await,
        Command::Variants(args) => run_variants(args),
        Command::Serve(args) => server::serve(args).await,
    }
}

async fn run_score(args: ScoreArgs) -> Result<(), String> {
    let (mut config, _) = ScoringConfig::load(None)?;
    if args.no_ml {
        config.ml.enabled = false;
    }

    let upload_date = match args.uploaded.as_deref() {
        Some(raw) => Some(api::parse_upload_date(raw)?),
        None => None,
    };

    let metrics = VideoMetrics {
        views: args.views,
        likes: args.likes,
        comments: args.comments,
        shares: args.shares,
        watch_time_seconds: api::sanitize_metric(args.watch_time),
        video_duration_seconds: api::sanitize_metric(args.duration),
        follower_count: args.followers,
        upload_date,
        gemini_viral_score: args.gemini_score.filter(|value| value.is_finite()),
    };

    let forced = match args.method.as_deref() {
        Some(raw) => Some(
            ScoringMethod::from_str(raw).ok_or_else(|| format!("invalid method: {}", raw))?,
        ),
        None => None,
    };

    let assigner =
        VariantAssigner::new(config.experiment.clone()).with_sink(Arc::new(TracingSink));
    let method = forced.unwrap_or_else(|| assigner.assign(&args.user_id));
    assigner.log_exposure(&args.user_id, method);

    let scorer = HybridScorer::from_config(&config)?;
    let outcome = scorer.score(&metrics, method).await;
    let result = outcome.result();
    assigner.log_outcome(&args.user_id, method, result.final_score);

    println!(
        "Viral score: {} ({} | {})",
        result.final_score,
        result.viral_category.as_str(),
        potential_label(result.final_score)
    );
    println!("Variant: {}", result.method.as_str());
    println!(
        "Views: {} | likes: {} | comments: {} | shares: {}",
        format_number(metrics.views as f64),
        format_number(metrics.likes as f64),
        format_number(metrics.comments as f64),
        format_number(metrics.shares as f64)
    );
    println!("Formula score: {}", result.formula_score);
    if let Some(ml_score) = result.ml_score {
        match result.ml_confidence {
            Some(confidence) => println!(
                "ML score: {} (confidence {})",
                format_float(ml_score, 1),
                format_float(confidence, 2)
            ),
            None => println!("ML score: {}", format_float(ml_score, 1)),
        }
    }
    if let Some(gemini_score) = result.gemini_score {
        println!("Gemini score: {}", format_float(gemini_score, 1));
    }
    println!(
        "Weights: ml {} | gemini {} | formula {}",
        format_float(result.weights.ml, 2),
        format_float(result.weights.gemini, 2),
        format_float(result.weights.formula, 2)
    );
    println!(
        "Sources: ml {} | gemini {} | formula {}",
        result.sources_available.ml, result.sources_available.gemini, result.sources_available.formula
    );
    if let Some(version) = &result.model_version {
        println!("Model version: {}", version);
    }
    if !result.top_features.is_empty() {
        println!("\nTop features:");
        for feature in &result.top_features {
            println!("  {}: {}", feature.feature, format_float(feature.importance, 3));
        }
    }
    if let Some(reason) = outcome.degrade_reason() {
        println!("\nWarning: {}", degrade_message(reason));
    }

    if args.breakdown {
        let breakdown = FormulaScorer::new().breakdown(&metrics);
        println!("\nBreakdown (total {}):", breakdown.total_score);
        print_sub_score("engagement", &breakdown.engagement);
        print_sub_score("retention", &breakdown.retention);
        print_sub_score("velocity", &breakdown.velocity);
        print_sub_score("relative reach", &breakdown.relative_reach);
    }

    Ok(())
}

fn print_sub_score(name: &str, sub: &SubScore) {
    println!(
        "  {:<15} {:>5} (weight {}) - {}",
        name,
        format_float(sub.score, 1),
        sub.weight,
        sub.description
    );
}

fn degrade_message(reason: &DegradeReason) -> String {
    match reason {
        DegradeReason::MlUnavailable(detail) => {
            format!("ml service unavailable ({}), scored without it", detail)
        }
        DegradeReason::MlDisabled => "ml scoring disabled, scored with formula".to_string(),
        DegradeReason::GeminiMissing => {
            "no gemini score supplied, scored with formula".to_string()
        }
    }
}

fn run_variants(args: VariantArgs) -> Result<(), String> {
    let (mut config, _) = ScoringConfig::load(None)?;
    if let Some(test_id) = args.test_id {
        config.experiment.test_id = test_id;
    }
    if args.cohort == 0 {
        return Err("cohort must be at least 1".to_string());
    }

    let assigner = VariantAssigner::new(config.experiment.clone());
    let ids: Vec<String> = (0..args.cohort).map(|i| format!("user-{}", i)).collect();
    let distribution = assigner.distribution(ids.iter().map(String::as_str));

    println!(
        "Test {} (enabled: {}), cohort of {}:",
        config.experiment.test_id,
        config.experiment.enabled,
        format_number(args.cohort as f64)
    );
    for entry in &config.experiment.allocation {
        let count = distribution.get(&entry.method).copied().unwrap_or(0);
        let observed = count as f64 / args.cohort as f64 * 100.0;
        println!(
            "  {:<8} configured {:>3}% | observed {:>5}% ({})",
            entry.method.as_str(),
            entry.percent,
            format_float(observed, 1),
            format_number(count as f64)
        );
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
