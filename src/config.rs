//! Configuration surface for [`crate::World`].

use glam::Vec3;

/// Tunables for a [`crate::World`]. Every epsilon and slop the solver and
/// narrowphase use is config, not a literal buried in the algorithm, so a
/// host can retune stability/performance trade-offs without forking the
/// crate.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Gravity applied to every non-sleeping dynamic body each step.
    pub gravity: Vec3,
    /// Fixed timestep used by the internal sub-step accumulator, in seconds.
    pub fixed_dt: f32,
    /// Maximum sub-steps run per call to [`crate::World::step`].
    pub max_substeps: u32,
    /// PGS sweeps per solve.
    pub max_solver_iterations: u32,

    /// Contacts within this squared distance (in local space) are fused
    /// across frames for warm-starting.
    pub contact_separation: f32,
    /// Relative epsilon used when comparing contact penetrations/positions.
    pub contact_precision: f32,

    /// EPA convergence tolerance: a face whose new support doesn't improve
    /// by at least this much is treated as the final penetration.
    pub epa_min_face_delta: f32,
    /// Hard cap on EPA polytope-expansion iterations.
    pub epa_max_iterations: u32,

    /// GJK progress epsilon: a support that doesn't advance by at least this
    /// much along the search direction terminates the iteration.
    pub gjk_epsilon: f32,
    /// Hard cap on GJK iterations.
    pub gjk_max_iterations: u32,

    /// Motion (smoothed `|v|^2 + |w|^2`) below this value is sleep-eligible.
    pub sleep_motion_threshold: f32,
    /// Low-pass blend factor for the `motion` smoothing, in `[0, 1]`.
    pub sleep_motion_bias: f32,
    /// Seconds a body must stay below `sleep_motion_threshold` before sleeping.
    pub sleep_time_threshold: f32,

    /// Baumgarte stabilization factor, in `[0, 1]`.
    pub baumgarte: f32,
    /// Restitution is only applied to approach speeds above this slop.
    pub restitution_slop: f32,
    /// Penetration below this slop is not corrected by the Baumgarte bias.
    pub penetration_slop: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_dt: 1.0 / 60.0,
            max_substeps: 4,
            max_solver_iterations: 10,

            contact_separation: 0.02,
            contact_precision: 1e-4,

            epa_min_face_delta: 1e-4,
            epa_max_iterations: 64,

            gjk_epsilon: 1e-6,
            gjk_max_iterations: 64,

            sleep_motion_threshold: 0.01,
            sleep_motion_bias: 0.9,
            sleep_time_threshold: 0.5,

            baumgarte: 0.2,
            restitution_slop: 0.05,
            penetration_slop: 0.005,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_stable() {
        let cfg = WorldConfig::default();
        assert!(cfg.fixed_dt > 0.0);
        assert!(cfg.sleep_motion_bias >= 0.0 && cfg.sleep_motion_bias <= 1.0);
        assert!(cfg.baumgarte >= 0.0 && cfg.baumgarte <= 1.0);
    }
}
