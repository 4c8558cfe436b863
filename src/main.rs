use clap::Parser;
use podreader::cli::{Cli, Commands};
use podreader::config::Config;
use podreader::pipeline::runner::{self, RunOverrides};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("podreader=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        runner::init_config(cli.config.as_deref(), force)?;
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env_overrides()?;

    match cli.command {
        Commands::Run {
            url,
            title,
            allow_raw_fallback,
            min_ratio,
        } => {
            let overrides = RunOverrides {
                allow_raw_fallback,
                min_ratio,
            };
            runner::run_pipeline(&config, &url, &title, &overrides).map(|_| ())
        }
        Commands::Status { url } => runner::show_status(&config, &url),
        Commands::Clean { url } => runner::clean(&config, &url),
        Commands::Init { .. } => Ok(()),
    }
}
