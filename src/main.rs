use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use signalguard::config::{ResolvedConfig, SignalGuardConfig};
use signalguard::incident::SeverityScorer;
use signalguard::metrics::{synthetic, PrometheusSource, Series};
use signalguard::recipes::{RecipeKind, RecipeReport};

#[derive(Parser)]
#[command(
    name = "signalguard",
    about = "Anomaly scoring and incident severity for metric time series",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $SIGNALGUARD_CONFIG, then ./signalguard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recipe on a series stored as JSON ({name, timestamps, values})
    Analyze {
        /// Series file
        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "zscore")]
        recipe: RecipeArg,

        /// Service the incident is attributed to
        #[arg(long)]
        service: String,

        /// Override the recipe's metric name
        #[arg(long)]
        metric: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Run a recipe on a seeded synthetic series
    Demo {
        #[arg(long, value_enum, default_value = "latency")]
        recipe: RecipeArg,

        /// Number of samples to generate
        #[arg(long, default_value = "300")]
        points: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "demo-service")]
        service: String,

        #[arg(long)]
        json: bool,
    },

    /// Fetch a range query from Prometheus and run a recipe on it
    Prometheus {
        /// PromQL expression
        #[arg(long)]
        query: String,

        #[arg(long)]
        service: String,

        /// Look-back window
        #[arg(long, default_value = "60")]
        minutes: u64,

        #[arg(long, value_enum, default_value = "zscore")]
        recipe: RecipeArg,

        #[arg(long)]
        metric: Option<String>,

        /// Overrides prometheus.base_url from the config
        #[arg(long, env = "SIGNALGUARD_PROMETHEUS_URL")]
        url: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecipeArg {
    Zscore,
    Latency,
    Ensemble,
}

impl From<RecipeArg> for RecipeKind {
    fn from(arg: RecipeArg) -> Self {
        match arg {
            RecipeArg::Zscore => RecipeKind::ZScore,
            RecipeArg::Latency => RecipeKind::Latency,
            RecipeArg::Ensemble => RecipeKind::Ensemble,
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn format_ts(ts: f64) -> String {
    DateTime::<Utc>::from_timestamp(ts as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{ts}"))
}

fn print_report(report: &RecipeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let incident = &report.incident;
    println!("\n=== SignalGuard Incident Report ===");
    println!("Recipe:     {}", report.recipe);
    println!("Service:    {}", incident.service());
    println!("Metric:     {}", incident.metric());
    println!("Points:     {}", incident.len());
    println!("Anomalies:  {}", incident.anomaly_count());
    println!("Max score:  {:.3}", incident.max_score());
    println!("Duration:   {:.0}s", incident.duration());
    println!("Severity:   {} ({:.3})", report.severity.level, report.severity.score);
    println!("Note:       {}", incident.note());

    let flagged = incident.anomaly_indices();
    if !flagged.is_empty() {
        println!("\n{:<8} | {:<20} | Score", "Index", "Timestamp");
        println!("{:-<8}-|-{:-<20}-|-{:-<10}", "", "", "");
        for &i in flagged.iter().take(20) {
            println!(
                "{:<8} | {:<20} | {:.3}",
                i,
                format_ts(incident.timestamps()[i]),
                incident.scores()[i]
            );
        }
        if flagged.len() > 20 {
            println!("... and {} more", flagged.len() - 20);
        }
    }
    println!("===================================\n");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // resolve before logging exists, report once it does
    let resolved = match &cli.config {
        Some(path) => ResolvedConfig::explicit(path)?,
        None => SignalGuardConfig::resolve(),
    };
    let config = resolved.config.clone();
    init_tracing(&config.logging.level, cli.log_json || config.logging.json);
    resolved.log();
    tracing::debug!(?config, "configuration resolved");

    let scorer = SeverityScorer::new(config.severity);

    match cli.command {
        Commands::Analyze {
            input,
            recipe,
            service,
            metric,
            json,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read series file: {}", input.display()))?;
            let series: Series = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse series file: {}", input.display()))?;
            tracing::info!(input = %input.display(), points = series.len(), "analyzing series");

            let recipe = RecipeKind::from(recipe).build(&service, metric.as_deref(), &config)?;
            let report = recipe.run_with_meta(&series, &scorer)?;
            print_report(&report, json)?;
        }
        Commands::Demo {
            recipe,
            points,
            seed,
            service,
            json,
        } => {
            let kind = RecipeKind::from(recipe);
            let series = match kind {
                RecipeKind::Latency => synthetic::latency_p95(points, seed),
                RecipeKind::ZScore | RecipeKind::Ensemble => synthetic::error_rate(points, seed),
            };
            tracing::info!(points, seed, series = %series.name(), "running demo");

            let recipe = kind.build(&service, None, &config)?;
            let report = recipe.run_with_meta(&series, &scorer)?;
            print_report(&report, json)?;
        }
        Commands::Prometheus {
            query,
            service,
            minutes,
            recipe,
            metric,
            url,
            json,
        } => {
            let base_url = url.as_deref().unwrap_or(&config.prometheus.base_url);
            let source = PrometheusSource::new(base_url, config.prometheus.timeout())?;
            let recipe = RecipeKind::from(recipe).build(&service, metric.as_deref(), &config)?;
            let report = signalguard::analyze_recent(
                &source,
                &query,
                minutes,
                &config.prometheus.step,
                recipe.as_ref(),
                &scorer,
            )
            .await?;
            print_report(&report, json)?;
        }
    }

    Ok(())
}
