use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use orderload::{
    BenchConfig, ConsoleReporter, HealthRating, HttpGateway, JsonReporter, OrderExecutor, Plan,
    Reporter, ScenarioRunner,
};
use tracing_subscriber::EnvFilter;

/// Load-test an order-submission service.
#[derive(Parser, Debug)]
#[command(name = "orderload", version, about)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root URL of the order service
    #[arg(long)]
    base_url: Option<String>,

    /// Which stages to run
    #[arg(long, value_enum, default_value_t = Plan::Escalation)]
    plan: Plan,

    /// Orders in the sequential batch
    #[arg(long)]
    sequential_count: Option<usize>,

    /// Sizes of the concurrent batches, in order (e.g. 5,10,20,50)
    #[arg(long, value_delimiter = ',')]
    batch_sizes: Option<Vec<usize>>,

    /// Pause between sequential requests, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Pause between executed stages, in milliseconds
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Bound on a single request, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Price jitter bound around the base price
    #[arg(long)]
    jitter: Option<f64>,

    /// Success ratio a concurrent batch needs before the next one runs
    #[arg(long)]
    min_success_ratio: Option<f64>,

    /// Open a fresh connection for every request
    #[arg(long)]
    no_keep_alive: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Debug logging (per-order outcomes)
    #[arg(short, long)]
    verbose: bool,

    /// Exit with status 2 when the run is rated POOR
    #[arg(long)]
    fail_on_poor: bool,
}

impl Cli {
    fn load_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)?,
            None => BenchConfig::default(),
        };

        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(count) = self.sequential_count {
            config.sequential_count = count;
        }
        if let Some(sizes) = &self.batch_sizes {
            config.concurrent_batch_sizes = sizes.clone();
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing_delay_ms = ms;
        }
        if let Some(ms) = self.cooldown_ms {
            config.cooldown_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.request_timeout_ms = ms;
        }
        if let Some(jitter) = self.jitter {
            config.jitter_bound = jitter;
        }
        if let Some(ratio) = self.min_success_ratio {
            config.escalation_min_success_ratio = ratio;
        }
        if self.no_keep_alive {
            config.keep_alive = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "orderload=debug" } else { "orderload=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.load_config().context("invalid configuration")?;
    tracing::info!(
        base_url = %config.base_url,
        plan = ?cli.plan,
        keep_alive = config.keep_alive,
        "Orderload starting"
    );

    let gateway = HttpGateway::new(&config.base_url, config.keep_alive)
        .context("failed to build HTTP client")?;
    let executor = OrderExecutor::from_config(gateway, &config);
    let runner = ScenarioRunner::from_config(executor, cli.plan.stages(&config), &config);

    let report = runner.run().await?;

    if cli.json {
        JsonReporter.report(&report).await?;
    } else {
        ConsoleReporter.report(&report).await?;
    }

    if cli.fail_on_poor && report.rating == HealthRating::Poor {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
