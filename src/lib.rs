//! Generation-tracked dotfile renderer.
//!
//! Every module under the dotfiles root is a directory of Tera templates.
//! A deploy renders each module into `<render_root>/<module>/<generation>/`,
//! records the output in a SQLite generation store, and publishes the files
//! into the module's target directory as atomically replaced symlinks.
//! Earlier generations stay on disk until cleaned up, so any of them can be
//! re-published without re-rendering.
//!
//! The public API is organised into layers:
//!
//! - **[`store`]**: generations, module records and rendered-file records
//! - **[`resources`]**: idempotent filesystem primitives (atomic symlink, hashing)
//! - **[`render`]**: the render/publish pass of one module
//! - **[`rollback`]**, **[`status`]**, **[`cleanup`]**, **[`history`]**, **[`adopt`]**:
//!   operations over recorded generations
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod adopt;
pub mod cleanup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod paths;
pub mod render;
pub mod resources;
pub mod rollback;
pub mod status;
pub mod store;
