//! Adopt existing files into a new module source directory.
//!
//! Adopted files are copied below `<dotfiles>/<module>/`, keeping their
//! layout relative to the deepest directory they share. Leading dots become
//! the `dot_` prefix so that the copies are visible in the dotfiles tree and
//! publish back under their original names. With deploy enabled the new
//! module is rendered straight away into that shared directory, which turns
//! the originals into links to the rendered copies.
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use tracing::info;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::AdoptError;
use crate::paths;
use crate::render::templates::DOT_PREFIX;
use crate::render::{PublishMode, RenderRequest, Variables, render_module};
use crate::store::Store;

/// Inputs of an adopt run.
#[derive(Debug, Clone, Copy)]
pub struct AdoptRequest<'a> {
    /// Files or directories to adopt (`~` is expanded against `home`).
    pub paths: &'a [PathBuf],
    /// Name of the new module.
    pub module_name: &'a str,
    /// Root holding module source directories.
    pub dotfiles_root: &'a Path,
    /// Root of the generation-scoped storage tree.
    pub render_root: &'a Path,
    /// Home directory used for `~` expansion.
    pub home: &'a Path,
    /// Variables for the deploy render.
    pub variables: &'a Variables,
    /// Render and link the new module right away.
    pub deploy: bool,
}

/// What an adopt run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adopted {
    /// Trimmed module name.
    pub module_name: String,
    /// New module source directory.
    pub module_dir: PathBuf,
    /// Directory the adopted files shared; the module's publish target.
    pub base_path: PathBuf,
    /// Copies created inside the module directory.
    pub files: Vec<PathBuf>,
    /// Generation created by the deploy, if any.
    pub generation_id: Option<Uuid>,
}

/// Trim a module name, rejecting blank names.
///
/// # Errors
///
/// Returns [`AdoptError::EmptyModuleName`] if nothing is left after trimming.
pub fn normalize_module_name(raw: &str) -> Result<String, AdoptError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AdoptError::EmptyModuleName);
    }
    Ok(name.to_string())
}

/// Name of the copy inside the module: `.vimrc` becomes `dot_vimrc`.
#[must_use]
pub fn to_module_filename(name: &OsStr) -> OsString {
    name.to_str()
        .and_then(|s| s.strip_prefix('.'))
        .map_or_else(|| name.to_os_string(), |rest| OsString::from(format!("{DOT_PREFIX}{rest}")))
}

/// Expand `~` and resolve `path` to an existing canonical path.
///
/// # Errors
///
/// Returns [`AdoptError::NotFound`] if the path does not exist.
pub fn resolve(path: &Path, home: &Path) -> Result<PathBuf, AdoptError> {
    let expanded = paths::expand_home(path, home);
    dunce::canonicalize(&expanded).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AdoptError::NotFound(expanded.clone())
        } else {
            AdoptError::Io {
                path: expanded.clone(),
                source,
            }
        }
    })
}

/// Deepest directory shared by all resolved `paths`. A single file yields
/// its parent directory.
///
/// # Errors
///
/// Returns [`AdoptError::NoCommonRoot`] if `paths` is empty or the paths
/// share no ancestor.
pub fn common_root(paths: &[PathBuf]) -> Result<PathBuf, AdoptError> {
    let (first, rest) = paths.split_first().ok_or(AdoptError::NoCommonRoot)?;
    let mut common: Vec<Component<'_>> = first.components().collect();
    for path in rest {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }
    if common.is_empty() {
        return Err(AdoptError::NoCommonRoot);
    }

    let root: PathBuf = common.iter().collect();
    if root.is_file() {
        return root
            .parent()
            .map(Path::to_path_buf)
            .ok_or(AdoptError::NoCommonRoot);
    }
    Ok(root)
}

/// Resolve the given paths to the files they name: files as given,
/// directories recursively in file-name order.
///
/// # Errors
///
/// Returns [`AdoptError::NotFound`] for a missing path and
/// [`AdoptError::Empty`] if no file was found.
pub fn expand_adopt_paths(paths: &[PathBuf], home: &Path) -> Result<Vec<PathBuf>, AdoptError> {
    let mut files = Vec::new();
    for path in paths {
        let resolved = resolve(path, home)?;
        if !resolved.is_dir() {
            files.push(resolved);
            continue;
        }
        for entry in WalkDir::new(&resolved).sort_by_file_name() {
            let entry = entry.map_err(|e| AdoptError::Io {
                path: resolved.clone(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    if files.is_empty() {
        return Err(AdoptError::Empty);
    }
    Ok(files)
}

/// Copy the files into a new module and optionally deploy it.
///
/// # Errors
///
/// Returns a validation error (missing paths, no common root, blank name,
/// existing module directory) before anything is copied, or an I/O, render
/// or store error from the copy and deploy steps.
pub fn adopt_files(store: &Store<'_>, request: &AdoptRequest<'_>) -> Result<Adopted, AdoptError> {
    let files = expand_adopt_paths(request.paths, request.home)?;
    let base_path = common_root(&files)?;
    let module_name = normalize_module_name(request.module_name)?;

    let module_dir = request.dotfiles_root.join(&module_name);
    if module_dir.exists() {
        return Err(AdoptError::ModuleExists(module_dir));
    }
    create_dir(&module_dir)?;

    let mut copies = Vec::with_capacity(files.len());
    for file in &files {
        let relative = file.strip_prefix(&base_path).map_err(|_| AdoptError::NoCommonRoot)?;
        let mut destination = module_dir.join(relative);
        if let Some(name) = relative.file_name() {
            destination.set_file_name(to_module_filename(name));
        }
        if let Some(parent) = destination.parent() {
            create_dir(parent)?;
        }
        std::fs::copy(file, &destination).map_err(|source| AdoptError::Io {
            path: destination.clone(),
            source,
        })?;
        copies.push(destination);
    }
    info!(module = %module_name, files = copies.len(), dir = %module_dir.display(), "adopted");

    let generation_id = if request.deploy {
        let generation = store.generations().create(None)?;
        render_module(
            store,
            &RenderRequest {
                source_dir: &module_dir,
                module_name: &module_name,
                target_dir: &base_path,
                variables: request.variables,
                render_root: request.render_root,
                generation_id: generation.id,
                mode: PublishMode::BestEffort,
            },
        )?;
        Some(generation.id)
    } else {
        None
    };

    Ok(Adopted {
        module_name,
        module_dir,
        base_path,
        files: copies,
        generation_id,
    })
}

fn create_dir(path: &Path) -> Result<(), AdoptError> {
    std::fs::create_dir_all(path).map_err(|source| AdoptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::store::Database;

    #[test]
    fn module_name_is_trimmed() {
        assert_eq!(normalize_module_name("  vim ").unwrap(), "vim");
        assert!(matches!(
            normalize_module_name(" \t"),
            Err(AdoptError::EmptyModuleName)
        ));
    }

    #[test]
    fn leading_dot_becomes_prefix() {
        assert_eq!(to_module_filename(OsStr::new(".vimrc")), OsString::from("dot_vimrc"));
        assert_eq!(to_module_filename(OsStr::new("init.lua")), OsString::from("init.lua"));
    }

    #[test]
    fn common_root_of_single_file_is_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".vimrc");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(common_root(&[file]).unwrap(), dir.path());
    }

    #[test]
    fn common_root_of_siblings_and_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("cfg/a");
        let b = dir.path().join("cfg/sub/b");
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();
        assert_eq!(common_root(&[a, b]).unwrap(), dir.path().join("cfg"));
    }

    #[test]
    fn common_root_of_nothing_fails() {
        assert!(matches!(common_root(&[]), Err(AdoptError::NoCommonRoot)));
    }

    #[cfg(windows)]
    #[test]
    fn paths_on_different_drives_share_no_root() {
        let paths = [PathBuf::from(r"C:\a"), PathBuf::from(r"D:\b")];
        assert!(matches!(common_root(&paths), Err(AdoptError::NoCommonRoot)));
    }

    #[test]
    fn expand_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nvim = dir.path().join("nvim");
        std::fs::create_dir_all(nvim.join("lua")).unwrap();
        std::fs::write(nvim.join("lua/plugins.lua"), "").unwrap();
        std::fs::write(nvim.join("init.lua"), "").unwrap();

        let files = expand_adopt_paths(&[nvim.clone()], dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dunce::canonicalize(&nvim).unwrap()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("init.lua"), PathBuf::from("lua/plugins.lua")]
        );
    }

    #[test]
    fn expand_rejects_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            expand_adopt_paths(&[dir.path().join("missing")], dir.path()),
            Err(AdoptError::NotFound(_))
        ));
        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(matches!(
            expand_adopt_paths(&[empty], dir.path()),
            Err(AdoptError::Empty)
        ));
    }

    #[test]
    fn tilde_is_expanded_against_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(".gitconfig"), "[user]").unwrap();
        let files = expand_adopt_paths(&[PathBuf::from("~/.gitconfig")], home.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".gitconfig"));
    }

    #[test]
    fn existing_module_dir_is_refused_before_copying() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let dotfiles = dir.path().join("dotfiles");
        std::fs::create_dir_all(dotfiles.join("vim")).unwrap();
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join(".vimrc"), "set number").unwrap();

        let mut db = Database::in_memory().unwrap();
        let err = db
            .unit_of_work(|store| {
                adopt_files(
                    store,
                    &AdoptRequest {
                        paths: &[home.join(".vimrc")],
                        module_name: "vim",
                        dotfiles_root: &dotfiles,
                        render_root: &dir.path().join("rendered"),
                        home: &home,
                        variables: &Variables::new(),
                        deploy: false,
                    },
                )
            })
            .unwrap_err();
        assert!(matches!(err, AdoptError::ModuleExists(_)));
        assert!(!dotfiles.join("vim/dot_vimrc").exists());
    }

    #[test]
    fn adopt_without_deploy_only_copies() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let dotfiles = dir.path().join("dotfiles");
        std::fs::create_dir_all(home.join(".config/git")).unwrap();
        std::fs::write(home.join(".config/git/config"), "[core]").unwrap();
        std::fs::write(home.join(".config/git/.ignore"), "*.o").unwrap();

        let mut db = Database::in_memory().unwrap();
        let adopted = db
            .unit_of_work(|store| {
                adopt_files(
                    store,
                    &AdoptRequest {
                        paths: &[PathBuf::from("~/.config/git")],
                        module_name: " git ",
                        dotfiles_root: &dotfiles,
                        render_root: &dir.path().join("rendered"),
                        home: &home,
                        variables: &Variables::new(),
                        deploy: false,
                    },
                )
            })
            .unwrap();

        assert_eq!(adopted.module_name, "git");
        assert_eq!(adopted.generation_id, None);
        assert_eq!(
            std::fs::read_to_string(dotfiles.join("git/config")).unwrap(),
            "[core]"
        );
        assert!(dotfiles.join("git/dot_ignore").exists());
        assert!(!home.join(".config/git/config").is_symlink());
        let generations = db
            .unit_of_work(|store| store.generations().list_by_recency_desc())
            .unwrap();
        assert!(generations.is_empty());
    }
}
