use clap::Parser;
use httpdump::config::{Cli, Config};
use httpdump::pipeline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);

    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = cli.capture_source();
    let exit_code = match pipeline::run(config, source).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            1
        }
    };

    std::process::exit(exit_code);
}
