use anyhow::Context;
use clap::Parser;
use drain_observe::logger_init;

mod cli;
mod run;
mod seed;
mod signal;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) Logger
    let log_cfg = cli.log.logger_config();
    log_cfg.validate().context("invalid logging options")?;
    logger_init(&log_cfg).context("initializing logger")?;

    // 2) Subcommand
    match cli.command {
        Command::Run(args) => run::run(&cli.redis_url, args).await,
        Command::Seed(args) => seed::seed(&cli.redis_url, args).await,
    }
}
