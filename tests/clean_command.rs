#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for retention and orphan cleanup after real deploys.

mod common;

use common::{IntegrationTestContext, read};
use stash::cleanup::{clean_orphans, cleanup_generations};
use stash::error::CleanupError;
use stash::history::collect_history;
use uuid::Uuid;

fn deploy_theme(ctx: &IntegrationTestContext, theme: &str) -> Uuid {
    ctx.write_config(&format!(
        "[variables]\ntheme = \"{theme}\"\n\n[modules.bat]\ntarget = \"~/.config/bat\"\n"
    ));
    ctx.deploy_default().generation_id.unwrap()
}

fn output_dir(ctx: &IntegrationTestContext, module: &str, id: Uuid) -> std::path::PathBuf {
    ctx.settings.render_root.join(module).join(id.to_string())
}

#[test]
fn retention_keeps_newest_generations_and_live_links() {
    let ctx = IntegrationTestContext::new();
    ctx.write_template("bat", "config", "--theme=\"{{ theme }}\"\n");
    let ids: Vec<Uuid> = ["gruvbox", "nord", "dracula"]
        .iter()
        .map(|t| deploy_theme(&ctx, t))
        .collect();

    let mut db = ctx.db();
    let deleted = db
        .unit_of_work(|store| cleanup_generations(store, 1, &ctx.settings.render_root))
        .unwrap();
    assert_eq!(deleted, vec![ids[1], ids[0]]);

    assert!(!output_dir(&ctx, "bat", ids[0]).exists());
    assert!(!output_dir(&ctx, "bat", ids[1]).exists());
    assert!(output_dir(&ctx, "bat", ids[2]).exists());
    assert_eq!(
        read(&ctx.home().join(".config/bat/config")),
        "--theme=\"dracula\"\n"
    );
}

#[test]
fn zero_retention_is_rejected_without_deleting() {
    let ctx = IntegrationTestContext::new();
    ctx.write_template("bat", "config", "--theme=\"{{ theme }}\"\n");
    deploy_theme(&ctx, "nord");

    let mut db = ctx.db();
    let err = db
        .unit_of_work(|store| cleanup_generations(store, 0, &ctx.settings.render_root))
        .unwrap_err();
    assert!(matches!(err, CleanupError::InvalidKeep(0)));
    let history = db
        .unit_of_work(|store| collect_history(store, None))
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn orphan_cleanup_drops_fully_superseded_generations() {
    let ctx = IntegrationTestContext::new();
    ctx.write_template("bat", "config", "--theme=\"{{ theme }}\"\n");
    let first = deploy_theme(&ctx, "nord");
    let second = deploy_theme(&ctx, "dracula");

    let mut db = ctx.db();
    let deleted = db
        .unit_of_work(|store| clean_orphans(store, &ctx.settings.render_root))
        .unwrap();
    assert_eq!(deleted, vec![first]);
    assert!(!output_dir(&ctx, "bat", first).exists());
    assert!(output_dir(&ctx, "bat", second).exists());

    let again = db
        .unit_of_work(|store| clean_orphans(store, &ctx.settings.render_root))
        .unwrap();
    assert!(again.is_empty());
}
