//! Command: move existing files into a new module.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::adopt::{AdoptRequest, Adopted, adopt_files, common_root, expand_adopt_paths};
use crate::cli::{AdoptOpts, GlobalOpts};
use crate::commands::CommandSetup;
use crate::config::{ModuleConfig, Settings, StashConfig};
use crate::error::{AdoptError, ConfigError};
use crate::logging::Logger;
use crate::store::Database;

/// Module name used when none is given: the shared parent directory's name.
///
/// # Errors
///
/// Returns an error if the paths cannot be resolved or share no named root.
pub fn default_module_name(paths: &[PathBuf], home: &Path) -> Result<String, AdoptError> {
    let files = expand_adopt_paths(paths, home)?;
    let root = common_root(&files)?;
    root.file_name()
        .map(|name| name.to_string_lossy().trim_start_matches('.').to_string())
        .filter(|name| !name.is_empty())
        .ok_or(AdoptError::NoCommonRoot)
}

/// `path` with a leading `home` replaced by `~`.
fn contract_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => PathBuf::from("~"),
        Ok(rest) => Path::new("~").join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Adopt `paths` into a module, register it in `config` and write the
/// document back to the configured path.
///
/// A newly registered module gets the adopted files' shared directory as
/// its target so later deploys publish to the same place.
///
/// # Errors
///
/// Returns an error if adopting fails or the document cannot be written.
pub fn adopt_into(
    db: &mut Database,
    settings: &Settings,
    config: &mut StashConfig,
    paths: &[PathBuf],
    name: Option<&str>,
    deploy: bool,
) -> Result<Adopted> {
    let module_name = match name {
        Some(name) => name.to_string(),
        None => default_module_name(paths, &settings.home)?,
    };
    let variables = config.variables_for(&settings.dotfiles_root);
    let request = AdoptRequest {
        paths,
        module_name: &module_name,
        dotfiles_root: &settings.dotfiles_root,
        render_root: &settings.render_root,
        home: &settings.home,
        variables: &variables,
        deploy,
    };
    let adopted = db
        .unit_of_work(|store| adopt_files(store, &request))
        .with_context(|| format!("adopting into module '{}'", module_name.trim()))?;

    if config.ensure_module(&adopted.module_name) {
        let target = contract_home(&adopted.base_path, &settings.home);
        config.modules.insert(
            adopted.module_name.clone(),
            ModuleConfig {
                target: Some(target),
            },
        );
        config
            .write(&settings.config_path)
            .context("updating module configuration")?;
    }
    Ok(adopted)
}

/// Run the adopt command.
///
/// # Errors
///
/// Returns an error if setup, adopting, or writing the configuration fails.
pub fn run(global: &GlobalOpts, opts: &AdoptOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    let mut config = match StashConfig::load(&setup.settings.config_path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(path)) => {
            log.debug(&format!("{} does not exist yet", path.display()));
            StashConfig::default()
        }
        Err(e) => return Err(e).context("loading module configuration"),
    };

    log.stage("Adopting files");
    let adopted = adopt_into(
        &mut setup.db,
        &setup.settings,
        &mut config,
        &opts.paths,
        opts.name.as_deref(),
        opts.should_deploy(),
    )?;

    log.info(&format!(
        "{} file(s) copied into {}",
        adopted.files.len(),
        adopted.module_dir.display()
    ));
    match adopted.generation_id {
        Some(id) => log.info(&format!(
            "deployed as generation {id}; originals now link into the render root"
        )),
        None => log.info("run `stash deploy` to publish the module"),
    }
    Ok(())
}
