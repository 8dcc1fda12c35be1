//! Idempotent filesystem primitives (check + apply pattern).
pub mod error;
pub mod helpers;
pub mod symlink;

use self::error::PublishError;

/// Interface for resources that can be described and applied.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Bring the resource to its desired state.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied due to I/O failures,
    /// permission issues, or a conflicting entry at the destination.
    fn apply(&self) -> Result<ResourceChange, PublishError>;
}

/// State of a resource on disk.
///
/// # Examples
///
/// ```
/// use stash::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "/other/path".into() };
/// let blocked = ResourceState::Invalid { reason: "target is a directory".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert_ne!(wrong, blocked);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// What is there now.
        current: String,
    },
    /// Resource cannot be applied (e.g. a real directory is in the way).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or replaced.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
}

/// Resources that can inspect their own state before applying.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState, PublishError>;
}

