use clap::Parser;
use clap_verbosity_flag::InfoLevel;
use clap_verbosity_flag::Verbosity;

use codeviz_worker::config::Config;
use codeviz_worker::worker;

/// Consume repository-analysis jobs and publish dependency graph artifacts
///
/// Blocks on the configured queue, analyzes each requested repository at a
/// handful of impactful commits, uploads the resulting graph to object
/// storage, and reports progress to the job store.
///
/// Service endpoints and credentials are read from the environment once at
/// startup: DATABASE_URL, REDIS_URL, AWS_REGION, AWS_ACCESS_KEY_ID,
/// AWS_SECRET_ACCESS_KEY, and S3_BUCKET. A `git` binary must be on PATH.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Consume this queue list instead of the default
    #[arg(long)]
    queue: Option<String>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.verbose.log_level_filter()).init();

    let mut config = Config::from_env();

    if let Some(queue) = cli.queue {
        config.queue_name = queue;
    }

    worker::run(&config)
}
