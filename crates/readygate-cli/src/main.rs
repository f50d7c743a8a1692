use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "readygate",
    about = "readygate — poll deployment URLs until they answer healthy",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll one target until it becomes ready or the budget runs out.
    ///
    /// Exits 0 when the target was observed ready, 1 otherwise; the
    /// outcome report goes to stdout either way.
    Wait {
        /// Target URL, e.g. http://app.internal:8080/healthz
        #[arg(env = "READYGATE_TARGET")]
        target: String,
        /// Maximum number of probe attempts
        #[arg(long, default_value_t = 30, env = "READYGATE_MAX_ATTEMPTS")]
        max_attempts: u32,
        /// Delay between attempts (500ms, 2s, 1m)
        #[arg(long, default_value = "2s", env = "READYGATE_INTERVAL")]
        interval: String,
        /// Per-attempt timeout, independent of the interval
        #[arg(long, default_value = "5s")]
        probe_timeout: String,
        /// Status code that counts as ready
        #[arg(long, default_value_t = 200)]
        expect: u16,
        /// Accept any 2xx/3xx response instead of an exact status
        #[arg(long)]
        accept_redirects: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Poll every target in a config file concurrently.
    WaitAll {
        /// Path to a readygate.toml target list
        #[arg(short, long, default_value = "readygate.toml", env = "READYGATE_CONFIG")]
        config: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("readygate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let all_ready = match cli.command {
        Commands::Wait {
            target,
            max_attempts,
            interval,
            probe_timeout,
            expect,
            accept_redirects,
            format,
        } => {
            commands::wait::wait(
                &target,
                max_attempts,
                &interval,
                &probe_timeout,
                expect,
                accept_redirects,
                &format,
            )
            .await?
        }
        Commands::WaitAll { config, format } => {
            commands::wait::wait_all(&config, &format).await?
        }
    };

    if !all_ready {
        std::process::exit(1);
    }
    Ok(())
}
