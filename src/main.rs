use anyhow::Result;
use clap::Parser;

use stash::cli::{Cli, Command};
use stash::commands;
use stash::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let command = args.command_or_default();

    let name = match &command {
        Command::Deploy(_) => "deploy",
        Command::History(_) => "history",
        Command::Rollback(_) => "rollback",
        Command::Clean(_) => "clean",
        Command::Adopt(_) => "adopt",
        Command::Status(_) => "status",
        Command::Version => return commands::version::run(),
    };
    init_subscriber(args.verbose, name);
    let log = Logger::new(name);

    match &command {
        Command::Deploy(opts) => commands::deploy::run(&args.global, opts, &log),
        Command::History(opts) => commands::history::run(&args.global, opts, &log),
        Command::Rollback(opts) => commands::rollback::run(&args.global, opts, &log),
        Command::Clean(opts) => commands::clean::run(&args.global, opts, &log),
        Command::Adopt(opts) => commands::adopt::run(&args.global, opts, &log),
        Command::Status(opts) => commands::status::run(&args.global, opts, &log),
        Command::Version => commands::version::run(),
    }
}
