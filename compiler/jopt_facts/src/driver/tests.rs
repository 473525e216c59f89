use jopt_ir::{FieldAccess, MethodAccess, MethodId, Program};
use pretty_assertions::assert_eq;

use super::*;
use crate::info::MethodFlags;
use crate::test_helpers::{method_id, program, test_config};

/// A call chain three deep, so facts need several iterations to reach the
/// outermost caller.
fn chain_program() -> Program {
    program(|b| {
        b.class("app/Main", |c| {
            c.field("count", "I", FieldAccess::STATIC);
            c.method("inner", "()V", MethodAccess::STATIC, |code| {
                code.iconst(1)
                    .putstatic("app/Main", "count", "I")
                    .return_void();
            });
            c.method("middle", "()V", MethodAccess::STATIC, |code| {
                code.invokestatic("app/Main", "inner", "()V").return_void();
            });
            c.method("outer", "()V", MethodAccess::STATIC, |code| {
                code.invokestatic("app/Main", "middle", "()V").return_void();
            });
            // Calls itself: must not keep the driver running.
            c.method("spin", "()V", MethodAccess::STATIC, |code| {
                code.invokestatic("app/Main", "spin", "()V").return_void();
            });
        });
    })
}

#[test]
fn run_converges_and_propagates_along_call_chains() {
    let program = chain_program();
    let mut driver = FixedPointDriver::new(&program, test_config()).unwrap();
    let mut store = driver.initial_store().unwrap();
    let iterations = driver.run(&mut store).unwrap();

    assert!(iterations >= 2);
    assert_eq!(driver.state(), DriverState::Converged { iterations });
    let outer = method_id(&program, "app/Main", "outer", "()V");
    assert!(store.method(outer).has_side_effects());
    let spin = method_id(&program, "app/Main", "spin", "()V");
    assert!(store.method(spin).has_no_side_effects());
}

#[test]
fn step_reports_progress_until_nothing_changes() {
    let program = chain_program();
    let mut driver = FixedPointDriver::new(&program, test_config()).unwrap();
    let mut store = driver.initial_store().unwrap();

    assert_eq!(driver.state(), DriverState::Running { iteration: 0 });
    assert_eq!(
        driver.step(&mut store).unwrap(),
        DriverState::Running { iteration: 1 }
    );
    let mut state = driver.state();
    while !state.is_converged() {
        state = driver.step(&mut store).unwrap();
    }
    // Stepping a converged driver is a no-op.
    assert_eq!(driver.step(&mut store).unwrap(), state);
}

#[test]
fn rerunning_on_converged_facts_changes_nothing() {
    let program = chain_program();
    let store = crate::analyze(&program, test_config()).unwrap();

    let mut again = store.clone();
    let mut driver = FixedPointDriver::new(&program, test_config()).unwrap();
    assert_eq!(driver.run(&mut again).unwrap(), 1);
    assert_eq!(again, store);
}

#[test]
fn runs_with_the_same_input_agree() {
    let program = chain_program();
    let first = crate::analyze(&program, test_config()).unwrap();
    let second = crate::analyze(&program, test_config()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn an_empty_marker_list_converges_at_once() {
    let program = chain_program();
    let mut driver = FixedPointDriver::new(&program, test_config())
        .unwrap()
        .with_markers(Vec::new());
    let mut store = driver.initial_store().unwrap();
    assert_eq!(driver.run(&mut store).unwrap(), 1);
}

// ── Misbehaving markers ─────────────────────────────────────────────

/// Promotes a flag on the first run, clears it on the second.
struct Flipper(MethodId);

impl FactMarker for Flipper {
    fn name(&self) -> &'static str {
        "flipper"
    }

    fn mark(&self, _: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let Some(facts) = store.method_mut(self.0) else {
            return Ok(Change::Unchanged);
        };
        if facts.flags.is_empty() {
            Ok(facts.promote(MethodFlags::HAS_SIDE_EFFECTS).into())
        } else {
            facts.flags = MethodFlags::empty();
            Ok(Change::Changed)
        }
    }
}

/// Promotes a flag but claims it did nothing.
struct Silent(MethodId);

impl FactMarker for Silent {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn mark(&self, _: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        if let Some(facts) = store.method_mut(self.0) {
            let _ = facts.promote(MethodFlags::HAS_SIDE_EFFECTS);
        }
        Ok(Change::Unchanged)
    }
}

/// Claims a change on every run.
struct Restless;

impl FactMarker for Restless {
    fn name(&self) -> &'static str {
        "restless"
    }

    fn mark(&self, _: &Environment<'_>, _: &mut FactStore) -> Result<Change, AnalysisError> {
        Ok(Change::Changed)
    }
}

#[test]
fn demotion_is_detected() {
    let program = chain_program();
    let inner = method_id(&program, "app/Main", "inner", "()V");
    let mut driver = FixedPointDriver::new(&program, test_config())
        .unwrap()
        .with_markers(vec![Box::new(Flipper(inner))]);
    let mut store = driver.initial_store().unwrap();

    let err = driver.run(&mut store).unwrap_err();
    assert!(matches!(err, AnalysisError::Demoted { marker: "flipper", .. }));
    assert!(err.to_string().contains("inner"));
}

#[test]
fn unreported_changes_are_detected() {
    let program = chain_program();
    let inner = method_id(&program, "app/Main", "inner", "()V");
    let mut driver = FixedPointDriver::new(&program, test_config())
        .unwrap()
        .with_markers(vec![Box::new(Silent(inner))]);
    let mut store = driver.initial_store().unwrap();

    assert_eq!(
        driver.run(&mut store),
        Err(AnalysisError::UnreportedChange { marker: "silent" })
    );
}

#[test]
fn unchecked_runs_trust_markers() {
    let program = chain_program();
    let inner = method_id(&program, "app/Main", "inner", "()V");
    let config = AnalysisConfig {
        verify_monotonicity: false,
        ..test_config()
    };
    let mut driver = FixedPointDriver::new(&program, config)
        .unwrap()
        .with_markers(vec![Box::new(Silent(inner))]);
    let mut store = driver.initial_store().unwrap();
    assert_eq!(driver.run(&mut store), Ok(1));
    assert!(store.method(inner).has_side_effects());
}

#[test]
fn the_iteration_cap_stops_a_restless_marker() {
    let program = chain_program();
    let config = AnalysisConfig {
        max_iterations: 5,
        ..test_config()
    };
    let mut driver = FixedPointDriver::new(&program, config)
        .unwrap()
        .with_markers(vec![Box::new(Restless)]);
    let mut store = driver.initial_store().unwrap();
    assert_eq!(
        driver.run(&mut store),
        Err(AnalysisError::NoConvergence { iterations: 5 })
    );
}

// ── Unresolved references ───────────────────────────────────────────

#[test]
fn unresolved_references_are_counted() {
    let program = program(|b| {
        b.class("app/Main", |c| {
            c.method("run", "()V", MethodAccess::STATIC, |code| {
                code.invokestatic("app/Missing", "go", "()V")
                    .getstatic("app/Main", "absent", "I")
                    .pop()
                    .invokestatic("app/Main", "run", "()V")
                    .return_void();
            });
        });
    });
    let driver = FixedPointDriver::new(&program, test_config()).unwrap();
    let env = driver.environment();
    let view = env
        .view(method_id(&program, "app/Main", "run", "()V"))
        .unwrap();
    assert_eq!(unresolved_references(env, &view), 2);
}
