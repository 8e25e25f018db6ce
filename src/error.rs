//! Error taxonomy for the physics core.

use thiserror::Error;

/// Errors surfaced by [`crate::World`]'s public API.
///
/// `InvalidArgument` is returned synchronously and never mutates the world.
/// `NumericalFallback` is recovered from internally (a warning event is the
/// only externally visible effect); it is exposed here only so callers that
/// want to observe it can match on it, not because it escapes a `step` call.
/// `Poisoned` is fatal: once returned, the world rejects every further call
/// to [`crate::World::step`].
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("numerical fallback during narrowphase: {0}")]
    NumericalFallback(String),

    #[error("invariant violated, world is poisoned: {0}")]
    InvariantViolation(String),

    #[error("world is poisoned by a prior invariant violation and rejects further steps")]
    Poisoned,

    #[error("unknown handle passed to physics world")]
    UnknownHandle,
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
