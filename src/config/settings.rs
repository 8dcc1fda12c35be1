//! Resolution of where the database, render root, dotfiles and config live.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::paths;

use super::CONFIG_FILE_NAME;

/// Environment variable overriding the database path.
pub const ENV_DB: &str = "STASH_DB";
/// Environment variable overriding the render root.
pub const ENV_RENDER_ROOT: &str = "STASH_RENDER_ROOT";
/// Environment variable overriding the dotfiles root.
pub const ENV_DOTFILES: &str = "STASH_DOTFILES";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    /// `--config`
    pub config: Option<PathBuf>,
    /// `--dotfiles`
    pub dotfiles: Option<PathBuf>,
    /// `--db`
    pub db: Option<PathBuf>,
    /// `--render-root`
    pub render_root: Option<PathBuf>,
}

/// Fully resolved, absolute locations used by one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The `stash.toml` document.
    pub config_path: PathBuf,
    /// Directory holding one source directory per module.
    pub dotfiles_root: PathBuf,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory holding `<module>/<generation>/` render outputs.
    pub render_root: PathBuf,
    /// Home directory used for `~` expansion.
    pub home: PathBuf,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if the home directory is unknown, or
    /// an I/O error if the working directory cannot be determined.
    pub fn from_env(overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        let home = paths::home_dir()?;
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(Self::resolve(overrides, &home, &cwd, |key| {
            std::env::var_os(key)
        }))
    }

    /// Resolve settings with precedence flag, then `env`, then defaults.
    ///
    /// Relative paths are taken against `cwd` and `~` against `home`.
    pub fn resolve<F>(overrides: &SettingsOverrides, home: &Path, cwd: &Path, env: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let pick = |flag: Option<&PathBuf>, var: &str| -> Option<PathBuf> {
            flag.cloned().or_else(|| {
                env(var)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
        };
        let absolute = |path: PathBuf| -> PathBuf {
            let expanded = paths::expand_home(&path, home);
            if expanded.is_absolute() {
                expanded
            } else {
                cwd.join(expanded)
            }
        };

        let dotfiles_root = absolute(
            pick(overrides.dotfiles.as_ref(), ENV_DOTFILES).unwrap_or_else(|| cwd.to_path_buf()),
        );
        let db_path = absolute(
            pick(overrides.db.as_ref(), ENV_DB).unwrap_or_else(|| paths::default_db_path(home)),
        );
        let render_root = absolute(
            pick(overrides.render_root.as_ref(), ENV_RENDER_ROOT)
                .unwrap_or_else(|| paths::default_render_root(home)),
        );
        let config_path = overrides
            .config
            .clone()
            .map_or_else(|| dotfiles_root.join(CONFIG_FILE_NAME), absolute);

        Self {
            config_path,
            dotfiles_root,
            db_path,
            render_root,
            home: home.to_path_buf(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn home() -> PathBuf {
        PathBuf::from("/home/alice")
    }

    fn cwd() -> PathBuf {
        PathBuf::from("/work/dots")
    }

    #[cfg(unix)]
    #[test]
    fn defaults_use_cwd_and_home_layout() {
        let settings = Settings::resolve(&SettingsOverrides::default(), &home(), &cwd(), env_of(&[]));
        assert_eq!(settings.dotfiles_root, cwd());
        assert_eq!(settings.config_path, cwd().join("stash.toml"));
        assert!(settings.db_path.ends_with("stash/stash.sqlite"));
        assert!(settings.render_root.ends_with("stash/rendered"));
        assert_eq!(settings.home, home());
    }

    #[cfg(unix)]
    #[test]
    fn environment_overrides_defaults() {
        let env = env_of(&[
            (ENV_DB, "/var/db.sqlite"),
            (ENV_RENDER_ROOT, "~/rendered"),
            (ENV_DOTFILES, "other"),
        ]);
        let settings = Settings::resolve(&SettingsOverrides::default(), &home(), &cwd(), env);
        assert_eq!(settings.db_path, PathBuf::from("/var/db.sqlite"));
        assert_eq!(settings.render_root, PathBuf::from("/home/alice/rendered"));
        assert_eq!(settings.dotfiles_root, PathBuf::from("/work/dots/other"));
        assert_eq!(
            settings.config_path,
            PathBuf::from("/work/dots/other/stash.toml")
        );
    }

    #[cfg(unix)]
    #[test]
    fn flags_override_environment() {
        let env = env_of(&[(ENV_DB, "/var/db.sqlite"), (ENV_DOTFILES, "/env/dots")]);
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("conf/stash.toml")),
            dotfiles: Some(PathBuf::from("/flag/dots")),
            db: Some(PathBuf::from("/flag/db.sqlite")),
            render_root: None,
        };
        let settings = Settings::resolve(&overrides, &home(), &cwd(), env);
        assert_eq!(settings.db_path, PathBuf::from("/flag/db.sqlite"));
        assert_eq!(settings.dotfiles_root, PathBuf::from("/flag/dots"));
        assert_eq!(
            settings.config_path,
            PathBuf::from("/work/dots/conf/stash.toml")
        );
    }

    #[cfg(unix)]
    #[test]
    fn empty_environment_values_are_ignored() {
        let env = env_of(&[(ENV_DOTFILES, "")]);
        let settings = Settings::resolve(&SettingsOverrides::default(), &home(), &cwd(), env);
        assert_eq!(settings.dotfiles_root, cwd());
    }
}
