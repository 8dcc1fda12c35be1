#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the `deploy` flow: rendering every configured
//! module into one generation and publishing it as symlinks.

mod common;

use common::{IntegrationTestContext, read};
use stash::cli::DeployOpts;
use stash::config::StashConfig;
use stash::error::ConfigError;
use stash::history::collect_history;

const CONFIG: &str = r#"
[variables]
accent = "ff8800"

[modules.alacritty]
target = "~/.config/alacritty"

[modules.vim]
target = "~"
"#;

fn setup() -> IntegrationTestContext {
    let ctx = IntegrationTestContext::new();
    ctx.write_config(CONFIG);
    ctx.write_template(
        "alacritty",
        "alacritty.toml",
        "[colors.primary]\nbackground = \"{{ accent | hex_color }}\"\n",
    );
    ctx.write_template("vim", "dot_vimrc", "\" from {{ dotfile_dir }}\nset number\n");
    ctx
}

#[test]
fn first_deploy_publishes_every_module() {
    let ctx = setup();
    let summary = ctx.deploy_default();

    assert!(summary.generation_id.is_some());
    assert_eq!(summary.published, vec!["alacritty", "vim"]);
    assert!(summary.failed.is_empty());

    let alacritty = ctx.home().join(".config/alacritty/alacritty.toml");
    assert!(alacritty.is_symlink());
    assert_eq!(
        read(&alacritty),
        "[colors.primary]\nbackground = \"#ff8800\"\n"
    );

    let vimrc = ctx.home().join(".vimrc");
    assert!(vimrc.is_symlink(), "dot_ prefix publishes as a dotfile");
    assert!(read(&vimrc).contains(&ctx.settings.dotfiles_root.display().to_string()));

    let target = std::fs::read_link(&vimrc).unwrap();
    assert!(target.starts_with(&ctx.settings.render_root));
    assert!(target.ends_with("dot_vimrc"));
}

#[test]
fn redeploy_without_changes_records_nothing() {
    let ctx = setup();
    ctx.deploy_default();
    let second = ctx.deploy_default();

    assert_eq!(second.generation_id, None);
    assert!(second.published.is_empty());
    assert_eq!(second.unchanged, vec!["alacritty", "vim"]);

    let mut db = ctx.db();
    let history = db
        .unit_of_work(|store| collect_history(store, None))
        .unwrap();
    assert_eq!(history.len(), 1, "the empty generation is removed again");
}

#[test]
fn changed_variable_republishes_only_affected_module() {
    let ctx = setup();
    let first = ctx.deploy_default().generation_id.unwrap();

    ctx.write_config(&CONFIG.replace("ff8800", "00ff00"));
    let summary = ctx.deploy(&DeployOpts {
        message: Some("green".to_string()),
        strict: false,
    });
    let second = summary.generation_id.unwrap();
    assert_ne!(first, second);
    assert_eq!(summary.published, vec!["alacritty"]);
    assert_eq!(summary.unchanged, vec!["vim"]);

    let alacritty = ctx.home().join(".config/alacritty/alacritty.toml");
    assert!(read(&alacritty).contains("#00ff00"));
    assert!(
        std::fs::read_link(&alacritty)
            .unwrap()
            .starts_with(ctx.settings.render_root.join("alacritty").join(second.to_string()))
    );

    let mut db = ctx.db();
    let history = db
        .unit_of_work(|store| collect_history(store, None))
        .unwrap();
    assert_eq!(history[0].id, second);
    assert_eq!(history[0].description.as_deref(), Some("green"));
    assert_eq!(history[0].modules, vec!["alacritty"]);
    assert_eq!(history[1].modules, vec!["alacritty", "vim"]);
}

#[test]
fn strict_deploy_discards_partially_rendered_module() {
    let ctx = setup();
    ctx.write_template("vim", "zz_broken", "{{ not_defined }}");

    let strict = ctx.deploy(&DeployOpts {
        message: None,
        strict: true,
    });
    assert_eq!(strict.discarded, vec!["vim"]);
    assert!(!ctx.home().join(".vimrc").exists());

    let lenient = ctx.deploy_default();
    assert_eq!(lenient.published, vec!["vim"]);
    assert!(ctx.home().join(".vimrc").is_symlink());
    assert!(!ctx.home().join("zz_broken").exists());
}

#[test]
fn directory_in_the_way_fails_only_that_module() {
    let ctx = setup();
    std::fs::create_dir_all(ctx.home().join(".vimrc/keep")).unwrap();

    let summary = ctx.deploy_default();
    assert_eq!(summary.published, vec!["alacritty"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "vim");
    assert!(ctx.home().join(".vimrc/keep").is_dir(), "existing data is kept");

    let mut db = ctx.db();
    let history = db
        .unit_of_work(|store| collect_history(store, None))
        .unwrap();
    assert_eq!(history[0].modules, vec!["alacritty"], "failed module left no rows");
}

#[test]
fn module_without_source_directory_is_unchanged() {
    let ctx = setup();
    ctx.write_config(&format!("{CONFIG}\n[modules.tmux]\n"));
    let summary = ctx.deploy_default();
    assert_eq!(summary.unchanged, vec!["tmux"]);
    assert_eq!(summary.published.len(), 2);
}

#[test]
fn missing_configuration_is_reported() {
    let ctx = IntegrationTestContext::new();
    let err = StashConfig::load(&ctx.settings.config_path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}
