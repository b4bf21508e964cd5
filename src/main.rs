use anyhow::Result;
use clap::Parser;

use fpsearch::cli::SubCommandExtend;
use fpsearch::config::*;

fn main() -> Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Search(config) => config.run(&opts),
        SubCommand::Match(config) => config.run(&opts),
        SubCommand::Extract(config) => config.run(&opts),
    }
}
