//! Monotone fixed-point driver.
//!
//! Runs every marker in order, over and over, until one full iteration
//! changes nothing.
//!
//! # Algorithm
//!
//! 1. **Initialize**: the setter installs one record per entity (see
//!    [`crate::setter`]).
//! 2. **Iterate**: run each marker once; each reports whether it promoted
//!    anything.
//! 3. **Stop** after an iteration in which no marker reported a change.
//!
//! Convergence follows from monotonicity: facts only move up finite
//! lattices (flags, masks, three-level value lattices, saturating counts),
//! so only finitely many promotions are possible. The iteration cap guards
//! against a marker that reports changes it does not make.
//!
//! With [`AnalysisConfig::verify_monotonicity`], every marker run is checked
//! against a snapshot: lowering a fact, or changing facts without reporting
//! it, aborts the run.

use jopt_ir::{ConstantOp, Program};

use crate::config::AnalysisConfig;
use crate::context::{Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::FactStore;
use crate::markers::{default_markers, Change, FactMarker};

/// Where the driver stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// `iteration` iterations have run and the last one changed something.
    Running { iteration: usize },
    /// The last of `iterations` iterations changed nothing. Facts are final.
    Converged { iterations: usize },
}

impl DriverState {
    #[inline]
    pub fn is_converged(self) -> bool {
        matches!(self, DriverState::Converged { .. })
    }
}

pub struct FixedPointDriver<'p> {
    env: Environment<'p>,
    markers: Vec<Box<dyn FactMarker>>,
    iteration: usize,
    state: DriverState,
}

impl<'p> FixedPointDriver<'p> {
    /// A driver over `program` with the default markers.
    pub fn new(program: &'p Program, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let env = Environment::new(program, config)?;
        let unresolved = env
            .views()
            .map(|view| unresolved_references(&env, &view))
            .sum::<usize>();
        if unresolved > 0 {
            tracing::warn!(
                count = unresolved,
                "unresolved member references; their facts are assumed pessimistic",
            );
        }
        Ok(Self {
            env,
            markers: default_markers(),
            iteration: 0,
            state: DriverState::Running { iteration: 0 },
        })
    }

    /// Replace the marker list.
    #[must_use]
    pub fn with_markers(mut self, markers: Vec<Box<dyn FactMarker>>) -> Self {
        self.markers = markers;
        self
    }

    pub fn environment(&self) -> &Environment<'p> {
        &self.env
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// A store with initial records for every entity.
    pub fn initial_store(&self) -> Result<FactStore, AnalysisError> {
        crate::setter::initialize(self.env.program, &self.env.hierarchy, &self.env.config)
    }

    /// Run one iteration of every marker.
    pub fn step(&mut self, store: &mut FactStore) -> Result<DriverState, AnalysisError> {
        if self.state.is_converged() {
            return Ok(self.state);
        }
        self.iteration += 1;
        let mut change = Change::Unchanged;
        for marker in &self.markers {
            change |= self.run_marker(marker.as_ref(), store)?;
        }
        tracing::debug!(
            iteration = self.iteration,
            changed = change.is_changed(),
            "fact iteration finished",
        );
        self.state = if change.is_changed() {
            DriverState::Running {
                iteration: self.iteration,
            }
        } else {
            DriverState::Converged {
                iterations: self.iteration,
            }
        };
        Ok(self.state)
    }

    /// Iterate until convergence.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, store: &mut FactStore) -> Result<usize, AnalysisError> {
        loop {
            if let DriverState::Converged { iterations } = self.step(store)? {
                tracing::debug!(iterations, "facts converged");
                return Ok(iterations);
            }
            if self.iteration >= self.env.config.max_iterations {
                return Err(AnalysisError::NoConvergence {
                    iterations: self.iteration,
                });
            }
        }
    }

    fn run_marker(
        &self,
        marker: &dyn FactMarker,
        store: &mut FactStore,
    ) -> Result<Change, AnalysisError> {
        if !self.env.config.verify_monotonicity {
            let change = marker.mark(&self.env, store)?;
            tracing::trace!(marker = marker.name(), changed = change.is_changed());
            return Ok(change);
        }

        let before = store.clone();
        let change = marker.mark(&self.env, store)?;
        tracing::trace!(marker = marker.name(), changed = change.is_changed());
        if let Some(entity) = store.find_demotion(&before) {
            return Err(AnalysisError::Demoted {
                marker: marker.name(),
                entity: entity.display(self.env.program),
            });
        }
        if !change.is_changed() && *store != before {
            return Err(AnalysisError::UnreportedChange {
                marker: marker.name(),
            });
        }
        Ok(change)
    }
}

/// Member references in `view` that name nothing in the program.
fn unresolved_references(env: &Environment<'_>, view: &MethodView<'_>) -> usize {
    (0..view.code.len())
        .filter(|&offset| {
            let Some((op, member)) = view.member_at(offset) else {
                return false;
            };
            match op {
                ConstantOp::GetField
                | ConstantOp::GetStatic
                | ConstantOp::PutField
                | ConstantOp::PutStatic => env
                    .hierarchy
                    .resolve_field_ref(env.program, member)
                    .is_none(),
                _ => env
                    .hierarchy
                    .resolve_method_ref(env.program, member)
                    .is_none(),
            }
        })
        .count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
