//! Opaque, generational handles into the world's arenas.
//!
//! Stable across ticks; invalidated the instant the referenced value is
//! removed (`slotmap` hands out a fresh generation on reuse, so a stale
//! handle reads as absent rather than as someone else's body).

slotmap::new_key_type! {
    pub struct BodyHandle;
    pub struct ColliderHandle;
    pub struct ConstraintHandle;
    pub struct ForceHandle;
}
