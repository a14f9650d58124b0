//! ragpipe CLI — crawl a site, build a dataset, ask it questions.
//!
//! Turns a website into a JSON Lines knowledge dataset and answers
//! questions over it through the research/write/grade chain.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
