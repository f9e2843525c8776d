//! Runtime Configuration - Learning Phase, Epsilon and Random Source
//!
//! Holds the small amount of global state the library depends on:
//!
//! - the numerical epsilon used by normalization and optimizers,
//! - the learning phase that switches dropout and normalization between
//!   training and prediction behaviour,
//! - the seeded random generator used by initializers and dropout masks.
//!
//! The learning phase is thread-local and scoped through an RAII guard, so
//! a prediction inside a training loop restores the training phase on exit.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::cell::Cell;
use std::sync::OnceLock;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

// =============================================================================
// Constants
// =============================================================================

/// Small constant guarding divisions and logarithms.
pub const EPSILON: f64 = 1e-8;

/// Default seed of the global random generator.
pub const DEFAULT_RANDOM_SEED: u64 = 42;

// =============================================================================
// Learning Phase
// =============================================================================

/// Whether the graph is being trained or used for prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LearningPhase {
    /// Dropout masks are drawn and normalization statistics are updated.
    #[default]
    Training,
    /// Dropout is the identity and normalization uses running statistics.
    Prediction,
}

thread_local! {
    static LEARNING_PHASE: Cell<LearningPhase> = const { Cell::new(LearningPhase::Training) };
}

/// Returns the learning phase of the current thread.
#[must_use]
pub fn learning_phase() -> LearningPhase {
    LEARNING_PHASE.with(Cell::get)
}

/// Sets the learning phase of the current thread.
pub fn set_learning_phase(phase: LearningPhase) {
    LEARNING_PHASE.with(|p| p.set(phase));
}

/// Returns true in the training phase.
#[must_use]
pub fn is_training() -> bool {
    learning_phase() == LearningPhase::Training
}

/// RAII guard that switches the learning phase and restores it on drop.
///
/// # Example
/// ```rust
/// use ceras_core::config::{learning_phase, LearningPhase, LearningPhaseGuard};
///
/// {
///     let _guard = LearningPhaseGuard::new(LearningPhase::Prediction);
///     assert_eq!(learning_phase(), LearningPhase::Prediction);
/// }
/// assert_eq!(learning_phase(), LearningPhase::Training);
/// ```
pub struct LearningPhaseGuard {
    prev_phase: LearningPhase,
}

impl LearningPhaseGuard {
    /// Enters `phase` until the guard is dropped.
    #[must_use]
    pub fn new(phase: LearningPhase) -> Self {
        let prev_phase = learning_phase();
        set_learning_phase(phase);
        Self { prev_phase }
    }

    /// Enters the prediction phase.
    #[must_use]
    pub fn prediction() -> Self {
        Self::new(LearningPhase::Prediction)
    }

    /// Enters the training phase.
    #[must_use]
    pub fn training() -> Self {
        Self::new(LearningPhase::Training)
    }
}

impl Drop for LearningPhaseGuard {
    fn drop(&mut self) {
        set_learning_phase(self.prev_phase);
    }
}

// =============================================================================
// Random Source
// =============================================================================

static RANDOM_GENERATOR: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn generator() -> &'static Mutex<StdRng> {
    RANDOM_GENERATOR.get_or_init(|| Mutex::new(StdRng::seed_from_u64(DEFAULT_RANDOM_SEED)))
}

/// Reseeds the global random generator.
pub fn set_random_seed(seed: u64) {
    *generator().lock() = StdRng::seed_from_u64(seed);
    tracing::debug!(seed, "random generator reseeded");
}

/// Runs `f` with exclusive access to the global random generator.
pub fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    let mut rng = generator().lock();
    f(&mut rng)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_phase_is_training() {
        assert_eq!(learning_phase(), LearningPhase::Training);
        assert!(is_training());
    }

    #[test]
    fn test_guard_restores_phase() {
        {
            let _guard = LearningPhaseGuard::prediction();
            assert!(!is_training());
            {
                let _inner = LearningPhaseGuard::training();
                assert!(is_training());
            }
            assert!(!is_training());
        }
        assert!(is_training());
    }

    #[test]
    fn test_rng_draws_in_range() {
        let x: f32 = with_rng(|rng| rng.gen_range(0.0..1.0));
        assert!((0.0..1.0).contains(&x));
    }
}
