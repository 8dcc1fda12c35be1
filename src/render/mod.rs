//! Renderer/publisher: turn one module's templates into a generation-scoped
//! output tree and publish it with atomic symlinks.
//!
//! A pass is skipped entirely when the rendered files hash the same as the
//! latest recorded output of the module, so re-running a deploy without
//! changes creates no rows, no directories and no links.
mod conditions;
pub mod templates;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RenderError;
use crate::paths;
use crate::resources::Applicable as _;
use crate::resources::helpers::fs::ensure_parent_dir;
use crate::resources::symlink::AtomicSymlink;
use crate::store::{ModuleRecord, Store};

pub use templates::{ModuleTemplates, RenderBatch, RenderedPayload, Variables};

/// What to do with already-rendered files when a later template fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishMode {
    /// Publish the files rendered before the failure.
    #[default]
    BestEffort,
    /// Discard the whole module; nothing is written or recorded.
    AllOrNothing,
}

/// Inputs of one module render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Module template source directory.
    pub source_dir: &'a Path,
    /// Module name.
    pub module_name: &'a str,
    /// Directory the files are published into.
    pub target_dir: &'a Path,
    /// Variables visible to every template.
    pub variables: &'a Variables,
    /// Root of the generation-scoped storage tree.
    pub render_root: &'a Path,
    /// Generation the new output belongs to.
    pub generation_id: Uuid,
    /// Handling of partially rendered modules.
    pub mode: PublishMode,
}

/// Result of a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// New output was written, recorded and linked.
    Published {
        /// The new module record.
        module: ModuleRecord,
        /// Number of files published.
        files: usize,
    },
    /// Output matches the latest recorded generation, or nothing rendered.
    Unchanged,
    /// Rendering stopped early and [`PublishMode::AllOrNothing`] discarded
    /// the batch.
    Discarded,
}

impl RenderOutcome {
    /// True if anything was (re)published.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Storage directory of a module in one generation:
/// `<render_root>/<module>/<generation>`.
#[must_use]
pub fn output_dir(render_root: &Path, module_name: &str, generation_id: Uuid) -> PathBuf {
    render_root
        .join(module_name)
        .join(generation_id.to_string())
}

/// Render one module and publish it if its content changed.
///
/// # Errors
///
/// Returns an error if the source tree cannot be read, the templates cannot
/// be assembled, a file cannot be written, a link cannot be published, or a
/// store operation fails. Per-template problems are logged instead.
pub fn render_module(
    store: &Store<'_>,
    request: &RenderRequest<'_>,
) -> Result<RenderOutcome, RenderError> {
    let module = request.module_name.trim();
    let source_dir = normalize(request.source_dir)?;

    let templates = ModuleTemplates::load(&source_dir, module)?;
    let batch = templates.render(module, request.variables);

    if batch.aborted && request.mode == PublishMode::AllOrNothing {
        warn!(module, "render aborted, discarding module output");
        return Ok(RenderOutcome::Discarded);
    }
    if batch.payloads.is_empty() {
        debug!(module, "nothing rendered");
        return Ok(RenderOutcome::Unchanged);
    }

    let current: BTreeMap<PathBuf, String> = batch
        .payloads
        .iter()
        .map(|p| (p.output_relative.clone(), p.content_hash.clone()))
        .collect();
    if let Some(prior) = store.modules().find_latest_by_name(module)? {
        let previous = store
            .rendered_files()
            .hashes_by_module(prior.id, &prior.output_path)?;
        if !previous.is_empty() && previous == current {
            debug!(module, generation = %prior.generation_id, "output unchanged");
            return Ok(RenderOutcome::Unchanged);
        }
    }

    publish(store, request, module, &batch.payloads)
}

/// Write, record and link a rendered batch.
fn publish(
    store: &Store<'_>,
    request: &RenderRequest<'_>,
    module: &str,
    payloads: &[RenderedPayload],
) -> Result<RenderOutcome, RenderError> {
    let output = normalize(&output_dir(
        request.render_root,
        module,
        request.generation_id,
    ))?;
    let target = normalize(request.target_dir)?;
    create_dir(&output)?;
    create_dir(&target)?;

    let record = store
        .modules()
        .create(request.generation_id, module, &output, &target)?;

    for payload in payloads {
        let file_path = record.output_path.join(&payload.output_relative);
        ensure_parent_dir(&file_path)?;
        std::fs::write(&file_path, payload.content.as_bytes()).map_err(|source| {
            RenderError::Io {
                path: file_path.clone(),
                source,
            }
        })?;
        store.rendered_files().create(
            record.id,
            &file_path,
            &payload.template_path,
            &payload.content_hash,
        )?;

        let link = record.target_path.join(&payload.output_relative);
        AtomicSymlink::new(file_path, link).apply()?;
    }

    info!(
        module,
        generation = %request.generation_id,
        files = payloads.len(),
        "module published"
    );
    Ok(RenderOutcome::Published {
        module: record,
        files: payloads.len(),
    })
}

fn normalize(path: &Path) -> Result<PathBuf, RenderError> {
    paths::normalize(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> Result<(), RenderError> {
    std::fs::create_dir_all(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(all(test, unix))]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::store::Database;
    use serde_json::Value;

    struct Fixture {
        _dir: tempfile::TempDir,
        source: PathBuf,
        target: PathBuf,
        render_root: PathBuf,
        db: Database,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("dotfiles").join("vim");
            std::fs::create_dir_all(&source).unwrap();
            Self {
                source,
                target: dir.path().join("home"),
                render_root: dir.path().join("rendered"),
                db: Database::in_memory().unwrap(),
                _dir: dir,
            }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.source.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn render(&mut self, variables: &Variables, mode: PublishMode) -> RenderOutcome {
            let source = self.source.clone();
            let target = self.target.clone();
            let render_root = self.render_root.clone();
            self.db
                .unit_of_work(|store| {
                    let generation = store.generations().create(None)?;
                    render_module(
                        store,
                        &RenderRequest {
                            source_dir: &source,
                            module_name: "vim",
                            target_dir: &target,
                            variables,
                            render_root: &render_root,
                            generation_id: generation.id,
                            mode,
                        },
                    )
                })
                .unwrap()
        }

        fn module_count(&mut self) -> usize {
            self.db
                .unit_of_work(|store| store.modules().list_all())
                .unwrap()
                .len()
        }
    }

    fn vars(v: i64) -> Variables {
        Variables::from([("v".to_string(), Value::from(v))])
    }

    #[test]
    fn second_identical_render_is_unchanged() {
        let mut fx = Fixture::new();
        fx.write("dot_vimrc", "set number");

        assert!(fx.render(&vars(1), PublishMode::BestEffort).changed());
        assert_eq!(
            fx.render(&vars(1), PublishMode::BestEffort),
            RenderOutcome::Unchanged
        );
        assert_eq!(fx.module_count(), 1);
    }

    #[test]
    fn changed_variable_republishes() {
        let mut fx = Fixture::new();
        fx.write("app.conf", "name={{ v }}");

        fx.render(&vars(1), PublishMode::BestEffort);
        let link = fx.target.join("app.conf");
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "name=1");

        let RenderOutcome::Published { module, files } =
            fx.render(&vars(2), PublishMode::BestEffort)
        else {
            panic!("expected publish");
        };
        assert_eq!(files, 1);
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "name=2");
        assert!(std::fs::read_link(&link).unwrap().starts_with(&module.output_path));
        assert_eq!(fx.module_count(), 2);
    }

    #[test]
    fn dot_prefixed_source_publishes_hidden_file() {
        let mut fx = Fixture::new();
        fx.write("dot_vimrc", "set number");
        fx.write("colors/theme.vim", "hi");

        fx.render(&Variables::new(), PublishMode::BestEffort);

        assert!(fx.target.join(".vimrc").is_symlink());
        assert!(!fx.target.join("dot_vimrc").exists());
        assert!(fx.target.join("colors/theme.vim").is_symlink());
    }

    #[test]
    fn storage_layout_is_generation_scoped() {
        let mut fx = Fixture::new();
        fx.write("dot_vimrc", "set number");

        let RenderOutcome::Published { module, .. } =
            fx.render(&Variables::new(), PublishMode::BestEffort)
        else {
            panic!("expected publish");
        };
        assert!(module.output_path.ends_with(format!("vim/{}", module.generation_id)));
        assert_eq!(
            std::fs::read_to_string(module.output_path.join(".vimrc")).unwrap(),
            "set number"
        );
    }

    #[test]
    fn best_effort_publishes_files_before_abort() {
        let mut fx = Fixture::new();
        fx.write("a.conf", "ok");
        fx.write("b.conf", "{{ undefined_thing }}");

        let outcome = fx.render(&Variables::new(), PublishMode::BestEffort);
        assert!(outcome.changed());
        assert!(fx.target.join("a.conf").is_symlink());
        assert!(!fx.target.join("b.conf").exists());
    }

    #[test]
    fn all_or_nothing_discards_partial_module() {
        let mut fx = Fixture::new();
        fx.write("a.conf", "ok");
        fx.write("b.conf", "{{ undefined_thing }}");

        let outcome = fx.render(&Variables::new(), PublishMode::AllOrNothing);
        assert_eq!(outcome, RenderOutcome::Discarded);
        assert!(!fx.target.exists());
        assert!(!fx.render_root.exists());
        assert_eq!(fx.module_count(), 0);
    }

    #[test]
    fn empty_module_is_unchanged() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.render(&Variables::new(), PublishMode::BestEffort),
            RenderOutcome::Unchanged
        );
        assert!(!fx.render_root.exists());
    }

    #[test]
    fn real_directory_at_link_path_fails_the_pass() {
        let mut fx = Fixture::new();
        fx.write("nvim", "x");
        std::fs::create_dir_all(fx.target.join("nvim")).unwrap();

        let source = fx.source.clone();
        let target = fx.target.clone();
        let render_root = fx.render_root.clone();
        let result = fx.db.unit_of_work(|store| {
            let generation = store.generations().create(None)?;
            render_module(
                store,
                &RenderRequest {
                    source_dir: &source,
                    module_name: "vim",
                    target_dir: &target,
                    variables: &Variables::new(),
                    render_root: &render_root,
                    generation_id: generation.id,
                    mode: PublishMode::BestEffort,
                },
            )
        });
        assert!(matches!(
            result,
            Err(RenderError::Publish(
                crate::error::PublishError::DirectoryConflict { .. }
            ))
        ));
        assert_eq!(fx.module_count(), 0, "failed pass must not commit rows");
    }
}
