//! Command: render every configured module into a new generation.
use anyhow::{Context as _, Result};
use uuid::Uuid;

use crate::cli::{DeployOpts, GlobalOpts};
use crate::commands::CommandSetup;
use crate::config::{Settings, StashConfig};
use crate::logging::Logger;
use crate::render::{PublishMode, RenderOutcome, RenderRequest, render_module};
use crate::store::Database;

/// Per-module results of one deploy run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploySummary {
    /// Generation kept for this run; `None` when nothing changed.
    pub generation_id: Option<Uuid>,
    /// Modules whose output was published.
    pub published: Vec<String>,
    /// Modules whose output was already current.
    pub unchanged: Vec<String>,
    /// Modules whose partial render was discarded.
    pub discarded: Vec<String>,
    /// Modules that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl DeploySummary {
    /// True if at least one module was published.
    #[must_use]
    pub const fn changed(&self) -> bool {
        !self.published.is_empty()
    }
}

/// Render and publish every module of `config` under one generation.
///
/// Each module is rendered in its own unit of work, so a failing module
/// leaves the others recorded. The generation is deleted again when no
/// module changed.
///
/// # Errors
///
/// Returns an error if the generation cannot be created or removed. Module
/// failures are collected in the summary instead.
pub fn deploy_modules(
    db: &mut Database,
    settings: &Settings,
    config: &StashConfig,
    opts: &DeployOpts,
    log: &Logger,
) -> Result<DeploySummary> {
    let mode = if opts.strict {
        PublishMode::AllOrNothing
    } else {
        PublishMode::BestEffort
    };
    let variables = config.variables_for(&settings.dotfiles_root);

    let generation = db
        .unit_of_work(|store| store.generations().create(opts.message.as_deref()))
        .context("creating generation")?;
    log.debug(&format!("generation {}", generation.id));

    let mut summary = DeploySummary::default();
    for name in config.modules.keys() {
        let source_dir = settings.dotfiles_root.join(name);
        let target_dir = config.module_target(name, &settings.home);
        let request = RenderRequest {
            source_dir: &source_dir,
            module_name: name,
            target_dir: &target_dir,
            variables: &variables,
            render_root: &settings.render_root,
            generation_id: generation.id,
            mode,
        };

        match db.unit_of_work(|store| render_module(store, &request)) {
            Ok(RenderOutcome::Published { files, .. }) => {
                log.info(&format!(
                    "\x1b[32m✓\x1b[0m {name} ({files} files → {})",
                    target_dir.display()
                ));
                summary.published.push(name.clone());
            }
            Ok(RenderOutcome::Unchanged) => {
                log.info(&format!("\x1b[2m· {name} (unchanged)\x1b[0m"));
                summary.unchanged.push(name.clone());
            }
            Ok(RenderOutcome::Discarded) => {
                log.warn(&format!("{name}: render aborted, nothing published"));
                summary.discarded.push(name.clone());
            }
            Err(e) => {
                log.error(&format!("{name}: {e}"));
                summary.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    if summary.changed() {
        summary.generation_id = Some(generation.id);
    } else {
        db.unit_of_work(|store| store.generations().delete(&generation))
            .context("removing empty generation")?;
    }
    Ok(summary)
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error if setup fails, the configuration is missing, or any
/// module failed.
pub fn run(global: &GlobalOpts, opts: &DeployOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    log.stage("Loading configuration");
    let config = setup.load_config()?;
    log.info(&format!(
        "{} modules from {}",
        config.modules.len(),
        setup.settings.config_path.display()
    ));

    log.stage("Deploying");
    let summary = deploy_modules(&mut setup.db, &setup.settings, &config, opts, log)?;

    match summary.generation_id {
        Some(id) => log.info(&format!(
            "generation {id}: {} published, {} unchanged",
            summary.published.len(),
            summary.unchanged.len()
        )),
        None => log.info("No changes detected"),
    }
    log.log_location();

    let count = summary.failed.len();
    if count > 0 {
        anyhow::bail!("{count} module(s) failed");
    }
    Ok(())
}
