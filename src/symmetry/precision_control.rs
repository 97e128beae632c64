//! Adaptive control of the symmetry tolerance along a cell-relaxation trajectory.
//!
//! During a cell relaxation, numerical noise in the atomic positions can make operations found at
//! an earlier step disappear. The controller reruns the symmetry analysis at different tolerances
//! to recover the historical number of operations, or to tighten a tolerance that had been
//! enlarged once it is no longer needed. Its decisions are made by the pure function
//! [`transition`], which inspects the trials run so far and returns the next state and action.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "precision_control_tests.rs"]
mod precision_control_tests;

/// The number of operations found with one tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// The tolerance used.
    pub epsilon: f64,

    /// The number of space-group operations found.
    pub nrotk: usize,
}

/// The states of the precision controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// Only the initial trial has been run.
    Stable,

    /// The tolerance is being enlarged to recover lost operations.
    Growing,

    /// The tolerance is being reduced. Trials from `start` onwards in the history belong to this
    /// phase; they are compared against the initial trial.
    Shrinking { start: usize },

    /// A tolerance has been committed.
    Committed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Growing => write!(f, "growing"),
            Self::Shrinking { .. } => write!(f, "shrinking"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

/// The actions requested by the precision controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ControllerAction {
    /// Run a trial analysis with this tolerance.
    Run(f64),

    /// Adopt this tolerance for the final analysis.
    Commit(f64),
}

/// Parameters of the precision controller for one structural step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrecisionControlConfig {
    /// The tolerance requested by the user.
    pub input_epsilon: f64,

    /// The ceiling beyond which the tolerance is not enlarged.
    pub max_epsilon: f64,

    /// The factor by which the tolerance is enlarged or reduced per trial.
    pub factor: f64,

    /// The maximum number of trials (including the initial one) in the shrinking phase.
    pub shrink_budget: usize,

    /// The largest number of operations found so far along the trajectory.
    pub target_nrotk: usize,
}

impl PrecisionControlConfig {
    /// Creates the standard configuration: factor $`2`$, ceiling
    /// $`\max(10^{-3}, 1.001\,\epsilon_{\mathrm{input}})`$ and a shrink budget of $`5`$.
    #[must_use]
    pub fn new(input_epsilon: f64, target_nrotk: usize) -> Self {
        Self {
            input_epsilon,
            max_epsilon: 1e-3_f64.max(1.001 * input_epsilon),
            factor: 2.0,
            shrink_budget: 5,
            target_nrotk,
        }
    }

    fn is_enlarged(&self, epsilon: f64) -> bool {
        epsilon > 1.001 * self.input_epsilon
    }

    fn shrunk(&self, epsilon: f64) -> f64 {
        (epsilon / self.factor).max(self.input_epsilon)
    }
}

/// Decides what to do once enlarging the tolerance has stopped, or was never needed.
fn after_growth(
    history: &[Trial],
    config: &PrecisionControlConfig,
) -> (ControllerState, ControllerAction) {
    let last = history[history.len() - 1];
    let enlarged = if last.epsilon > config.max_epsilon {
        // Fall back to the smallest tolerance giving the final count.
        let mut valid = history.len() - 1;
        while valid > 0 && last.nrotk <= history[valid - 1].nrotk {
            valid -= 1;
        }
        if valid > 0 {
            return (
                ControllerState::Committed,
                ControllerAction::Commit(history[valid].epsilon),
            );
        }
        false
    } else {
        history.len() > 1
    };

    let initial = history[0];
    if enlarged {
        (ControllerState::Committed, ControllerAction::Commit(last.epsilon))
    } else if config.is_enlarged(initial.epsilon) {
        (
            ControllerState::Shrinking {
                start: history.len(),
            },
            ControllerAction::Run(config.shrunk(initial.epsilon)),
        )
    } else {
        (ControllerState::Committed, ControllerAction::Commit(initial.epsilon))
    }
}

/// Computes the next state and action of the precision controller.
///
/// # Arguments
///
/// * `state` - The current state.
/// * `history` - All trials run so far in this structural step, the initial one first.
/// * `config` - The controller parameters.
///
/// # Panics
///
/// Panics if `history` is empty.
#[must_use]
pub fn transition(
    state: ControllerState,
    history: &[Trial],
    config: &PrecisionControlConfig,
) -> (ControllerState, ControllerAction) {
    assert!(
        !history.is_empty(),
        "The precision controller needs at least the initial trial."
    );
    let last = history[history.len() - 1];
    match state {
        ControllerState::Stable | ControllerState::Growing => {
            if last.nrotk < config.target_nrotk && last.epsilon < config.max_epsilon {
                (
                    ControllerState::Growing,
                    ControllerAction::Run(last.epsilon * config.factor),
                )
            } else {
                after_growth(history, config)
            }
        }
        ControllerState::Shrinking { start } => {
            let trials = std::iter::once(history[0])
                .chain(history[start.min(history.len())..].iter().copied())
                .collect::<Vec<_>>();
            let base = trials[0];
            let current = trials[trials.len() - 1];
            if current.nrotk >= base.nrotk
                && config.is_enlarged(current.epsilon)
                && trials.len() < config.shrink_budget
            {
                (state, ControllerAction::Run(config.shrunk(current.epsilon)))
            } else {
                let valid = if current.nrotk < base.nrotk {
                    trials.len() - 2
                } else {
                    trials.len() - 1
                };
                (
                    ControllerState::Committed,
                    ControllerAction::Commit(trials[valid].epsilon),
                )
            }
        }
        ControllerState::Committed => {
            (ControllerState::Committed, ControllerAction::Commit(last.epsilon))
        }
    }
}
