//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the stash dotfile renderer.
#[derive(Parser, Debug)]
#[command(
    name = "stash",
    about = "Render dotfile templates into tracked generations and publish them as symlinks",
    version
)]
pub struct Cli {
    /// Subcommand; `deploy` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Location overrides.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The subcommand to run, defaulting to a plain `deploy`.
    #[must_use]
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Deploy(DeployOpts::default()))
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Path to stash.toml (default: <dotfiles>/stash.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Dotfiles root holding one directory per module (env: STASH_DOTFILES)
    #[arg(long, global = true, value_name = "DIR")]
    pub dotfiles: Option<PathBuf>,

    /// Generation database (env: STASH_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Directory for rendered generations (env: STASH_RENDER_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub render_root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render every configured module and publish changes
    Deploy(DeployOpts),
    /// List generations, newest first
    History(HistoryOpts),
    /// Re-point links at the outputs of an earlier generation
    Rollback(RollbackOpts),
    /// Delete old or orphaned generations
    Clean(CleanOpts),
    /// Move existing files into a new module
    Adopt(AdoptOpts),
    /// Show published files that changed on disk
    Status(StatusOpts),
    /// Print version information
    Version,
}

/// Options for the `deploy` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DeployOpts {
    /// Description stored with the generation
    #[arg(short, long)]
    pub message: Option<String>,

    /// Publish nothing for a module whose render aborts
    #[arg(long)]
    pub strict: bool,
}

/// Options for the `history` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct HistoryOpts {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Only generations containing this module
    #[arg(short, long)]
    pub module: Option<String>,
}

/// Options for the `rollback` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RollbackOpts {
    /// Generation id to restore
    pub generation: uuid::Uuid,

    /// Restore only these modules
    #[arg(long, num_args = 1..)]
    pub modules: Vec<String>,
}

/// Options for the `clean` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct CleanOpts {
    /// Keep this many most recent generations; without it, remove orphans
    #[arg(long)]
    pub keep: Option<usize>,
}

/// Options for the `adopt` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct AdoptOpts {
    /// Files or directories to adopt
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Module name (default: name of the common parent directory)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Deploy the new module after copying (default)
    #[arg(long, overrides_with = "no_deploy")]
    pub deploy: bool,

    /// Only copy the files into the module
    #[arg(long, overrides_with = "deploy")]
    pub no_deploy: bool,
}

impl AdoptOpts {
    /// Whether the adopted module is deployed; the last flag given wins.
    #[must_use]
    pub const fn should_deploy(&self) -> bool {
        !self.no_deploy
    }
}

/// Options for the `status` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct StatusOpts {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_deploy() {
        let cli = Cli::parse_from(["stash"]);
        assert!(cli.command.is_none());
        assert!(matches!(
            cli.command_or_default(),
            Command::Deploy(DeployOpts {
                message: None,
                strict: false
            })
        ));
    }

    #[test]
    fn parse_deploy_options() {
        let cli = Cli::parse_from(["stash", "deploy", "-m", "new theme", "--strict"]);
        let Some(Command::Deploy(opts)) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(opts.message.as_deref(), Some("new theme"));
        assert!(opts.strict);
    }

    #[test]
    fn parse_global_paths_after_subcommand() {
        let cli = Cli::parse_from([
            "stash",
            "status",
            "--db",
            "/tmp/s.sqlite",
            "--render-root",
            "/tmp/r",
            "--dotfiles",
            "/dots",
            "--config",
            "/dots/alt.toml",
        ]);
        assert_eq!(cli.global.db, Some(PathBuf::from("/tmp/s.sqlite")));
        assert_eq!(cli.global.render_root, Some(PathBuf::from("/tmp/r")));
        assert_eq!(cli.global.dotfiles, Some(PathBuf::from("/dots")));
        assert_eq!(cli.global.config, Some(PathBuf::from("/dots/alt.toml")));
    }

    #[test]
    fn parse_rollback_with_modules() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let cli = Cli::parse_from(["stash", "rollback", id, "--modules", "vim", "zsh"]);
        let Some(Command::Rollback(opts)) = cli.command else {
            panic!("expected rollback");
        };
        assert_eq!(opts.generation.to_string(), id);
        assert_eq!(opts.modules, vec!["vim", "zsh"]);
    }

    #[test]
    fn rollback_rejects_invalid_id() {
        assert!(Cli::try_parse_from(["stash", "rollback", "not-a-uuid"]).is_err());
    }

    #[test]
    fn parse_clean_keep() {
        let cli = Cli::parse_from(["stash", "clean", "--keep", "3"]);
        assert!(matches!(
            cli.command,
            Some(Command::Clean(CleanOpts { keep: Some(3) }))
        ));
        let cli = Cli::parse_from(["stash", "clean"]);
        assert!(matches!(
            cli.command,
            Some(Command::Clean(CleanOpts { keep: None }))
        ));
    }

    #[test]
    fn adopt_deploys_by_default() {
        let cli = Cli::parse_from(["stash", "adopt", "~/.vimrc", "--name", "vim"]);
        let Some(Command::Adopt(opts)) = cli.command else {
            panic!("expected adopt");
        };
        assert!(opts.should_deploy());
        assert_eq!(opts.name.as_deref(), Some("vim"));
        assert_eq!(opts.paths, vec![PathBuf::from("~/.vimrc")]);

        let cli = Cli::parse_from(["stash", "adopt", "a", "b", "--no-deploy"]);
        let Some(Command::Adopt(opts)) = cli.command else {
            panic!("expected adopt");
        };
        assert!(!opts.should_deploy());
        assert_eq!(opts.paths.len(), 2);
    }

    #[test]
    fn last_deploy_flag_wins() {
        let cli = Cli::parse_from(["stash", "adopt", "a", "--no-deploy", "--deploy"]);
        let Some(Command::Adopt(opts)) = cli.command else {
            panic!("expected adopt");
        };
        assert!(opts.should_deploy());
    }

    #[test]
    fn adopt_requires_paths() {
        assert!(Cli::try_parse_from(["stash", "adopt"]).is_err());
    }

    #[test]
    fn parse_history_and_status_flags() {
        let cli = Cli::parse_from(["stash", "history", "--json", "-m", "git"]);
        assert!(matches!(
            cli.command,
            Some(Command::History(HistoryOpts { json: true, module: Some(ref m) })) if m == "git"
        ));
        let cli = Cli::parse_from(["stash", "-v", "status", "--json"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(Command::Status(StatusOpts { json: true }))
        ));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["stash", "version"]);
        assert!(matches!(cli.command, Some(Command::Version)));
    }
}
