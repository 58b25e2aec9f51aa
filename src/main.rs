use clap::Parser;

use reharvest::config::load_harvest_config;
use reharvest::strategy::StrategyKind;
use reharvest::Harvester;

/// Adaptive re-harvester: repeatedly fetches a set of URLs and adjusts each
/// URL's re-fetch delay to keep observed content drift near a target
/// similarity, archiving every capture to WARC.
#[derive(Parser, Debug)]
#[command(name = "reharvest", version, about)]
struct Cli {
    /// Path to a file with one URL per line.
    #[arg(short, long)]
    urls: String,

    /// Target similarity in (0, 1). Ignored by the constant strategy.
    #[arg(short, long)]
    target: Option<f64>,

    /// Initial per-URL delay estimate in seconds.
    #[arg(short = 'd', long)]
    default_delay: Option<f64>,

    /// Delay-estimation strategy: constant, simple, bisection, reciprocal, average.
    #[arg(short, long)]
    strategy: Option<String>,

    /// Base name for the output WARC file (written as `<name>.warc.gz`).
    #[arg(short, long)]
    output: Option<String>,

    /// Number of fetch tasks allowed to run concurrently.
    #[arg(short, long)]
    worker_count: Option<usize>,

    /// Minimum re-fetch delay in seconds.
    #[arg(long)]
    lower_clamp: Option<f64>,

    /// Maximum re-fetch delay in seconds.
    #[arg(long)]
    upper_clamp: Option<f64>,
}

/// Reads one URL per line, skipping blanks and `#`-comments, and rejects
/// any line that doesn't parse as an absolute URL rather than handing a
/// malformed target to the scheduler.
fn read_urls(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let mut urls = Vec::new();
    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match url::Url::parse(line) {
            Ok(parsed) => urls.push(parsed.to_string()),
            Err(e) => {
                tracing::warn!(line = lineno + 1, url = line, error = %e, "skipping malformed URL");
            }
        }
    }
    Ok(urls)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let file_config = load_harvest_config();

    let urls = read_urls(&cli.urls)?;
    let target = cli.target.unwrap_or_else(|| file_config.resolve_target());
    let default_delay = cli
        .default_delay
        .unwrap_or_else(|| file_config.resolve_default_delay());
    let worker_count = cli
        .worker_count
        .unwrap_or_else(|| file_config.resolve_worker_count());
    let output = cli.output.unwrap_or_else(|| file_config.resolve_output());
    let lower_clamp = cli
        .lower_clamp
        .unwrap_or_else(|| file_config.resolve_lower_clamp());
    let upper_clamp = cli
        .upper_clamp
        .unwrap_or_else(|| file_config.resolve_upper_clamp());

    let strategy: StrategyKind = match cli.strategy {
        Some(s) => s.parse()?,
        None => file_config.resolve_strategy()?,
    };

    tracing::info!(
        url_count = urls.len(),
        target,
        default_delay,
        worker_count,
        output,
        lower_clamp,
        upper_clamp,
        strategy = ?strategy,
        "starting harvest"
    );

    let harvester = Harvester::new(&output, worker_count, lower_clamp, upper_clamp)?;
    let handle = harvester.harvest(urls, target, default_delay, strategy)?;
    handle.await?;

    Ok(())
}
