//! Staged continuation strategies for the flame solve.
//!
//! A cold start works up from a mixture-averaged, fixed-temperature flame
//! to a refined multicomponent one. Sensitivity and restart solves start
//! from an existing solution and take a single full-physics step.

use crate::solver::{FlameSolver, RefineCriteria, TransportModel};
use ks_model::{SolveMode, StageOutcome};
use serde::Serialize;

pub const ENERGY_REFINE: RefineCriteria = RefineCriteria::new(10.0, 0.06, 0.08, 0.0);
pub const MULTICOMPONENT_REFINE: RefineCriteria = RefineCriteria::new(10.0, 0.06, 0.08, 1.0e-4);

/// Time-step counts for the first cold-start stage.
const COLD_TIME_STEPS: &[u32] = &[2, 5, 10, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolvePath {
    ColdStart,
    Sensitivity,
    Restart,
}

impl SolvePath {
    pub fn select(has_restart: bool, mode: SolveMode) -> Self {
        match (mode, has_restart) {
            (SolveMode::Sensitivity, _) => SolvePath::Sensitivity,
            (SolveMode::Standard, true) => SolvePath::Restart,
            (SolveMode::Standard, false) => SolvePath::ColdStart,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolvePath::ColdStart => "cold-start",
            SolvePath::Sensitivity => "sensitivity",
            SolvePath::Restart => "restart",
        }
    }

    pub fn stages(self) -> Vec<Stage> {
        match self {
            SolvePath::ColdStart => vec![
                Stage {
                    name: "mixture-averaged, no energy equation, no refinement",
                    energy: Some(false),
                    transport: Some(TransportModel::MixtureAveraged),
                    soret: None,
                    jacobian_age: Some((10, 10)),
                    time_step: Some((1.0e-5, COLD_TIME_STEPS)),
                    refine_criteria: None,
                    refine_grid: false,
                    attempts: 2,
                    quiet: false,
                },
                Stage {
                    name: "mixture-averaged, energy equation, refinement",
                    energy: Some(true),
                    refine_criteria: Some(ENERGY_REFINE),
                    refine_grid: true,
                    attempts: 2,
                    ..Stage::EMPTY
                },
                Stage {
                    name: "multicomponent with Soret diffusion",
                    transport: Some(TransportModel::Multicomponent),
                    soret: Some(true),
                    refine_criteria: Some(MULTICOMPONENT_REFINE),
                    refine_grid: true,
                    attempts: 1,
                    ..Stage::EMPTY
                },
            ],
            SolvePath::Sensitivity => vec![Stage {
                name: "perturbed solution",
                energy: Some(true),
                transport: Some(TransportModel::Multicomponent),
                soret: Some(true),
                refine_grid: false,
                attempts: 1,
                quiet: true,
                ..Stage::EMPTY
            }],
            SolvePath::Restart => vec![Stage {
                name: "restart solution",
                energy: Some(true),
                transport: Some(TransportModel::Multicomponent),
                soret: Some(true),
                refine_criteria: Some(MULTICOMPONENT_REFINE),
                refine_grid: false,
                attempts: 1,
                ..Stage::EMPTY
            }],
        }
    }
}

/// One continuation step: solver settings to apply, then up to `attempts`
/// solves. Unset options keep their previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: &'static str,
    pub energy: Option<bool>,
    pub transport: Option<TransportModel>,
    pub soret: Option<bool>,
    pub jacobian_age: Option<(u32, u32)>,
    pub time_step: Option<(f64, &'static [u32])>,
    pub refine_criteria: Option<RefineCriteria>,
    pub refine_grid: bool,
    pub attempts: u32,
    /// Solve with solver logging off.
    pub quiet: bool,
}

impl Stage {
    const EMPTY: Stage = Stage {
        name: "",
        energy: None,
        transport: None,
        soret: None,
        jacobian_age: None,
        time_step: None,
        refine_criteria: None,
        refine_grid: false,
        attempts: 1,
        quiet: false,
    };

    fn configure<S: FlameSolver + ?Sized>(&self, solver: &mut S) {
        if let Some(on) = self.energy {
            solver.set_energy_enabled(on);
        }
        if let Some(model) = self.transport {
            solver.set_transport_model(model);
        }
        if let Some(on) = self.soret {
            solver.set_soret_enabled(on);
        }
        if let Some((steady, transient)) = self.jacobian_age {
            solver.set_max_jac_age(steady, transient);
        }
        if let Some((dt, schedule)) = self.time_step {
            solver.set_time_step(dt, schedule);
        }
        if let Some(criteria) = self.refine_criteria {
            solver.set_refine_criteria(criteria);
        }
    }

    /// Configure the solver and solve, retrying on failure. Failures are
    /// logged and recorded, never returned.
    pub fn run<S: FlameSolver + ?Sized>(
        &self,
        solver: &mut S,
        gas: &S::Gas,
        loglevel: u32,
    ) -> StageOutcome {
        self.configure(solver);
        let loglevel = if self.quiet { 0 } else { loglevel };
        tracing::info!(
            stage = self.name,
            energy = solver.energy_enabled(),
            transport = ?solver.transport_model(),
            refine = self.refine_grid,
            "flame stage"
        );

        let mut attempts = 0;
        while attempts < self.attempts {
            attempts += 1;
            match solver.solve(gas, loglevel, self.refine_grid) {
                Ok(()) => {
                    return StageOutcome {
                        stage: self.name.to_string(),
                        attempts,
                        converged: true,
                    };
                }
                Err(e) if attempts < self.attempts => {
                    tracing::info!(stage = self.name, attempt = attempts, error = %e, "attempt failed, retrying");
                }
                Err(e) => {
                    tracing::warn!(stage = self.name, attempt = attempts, error = %e, "could not find a solution");
                }
            }
        }

        StageOutcome {
            stage: self.name.to_string(),
            attempts,
            converged: false,
        }
    }
}

/// Run every stage of `path` in order.
pub fn run_path<S: FlameSolver + ?Sized>(
    path: SolvePath,
    solver: &mut S,
    gas: &S::Gas,
    loglevel: u32,
) -> Vec<StageOutcome> {
    path.stages()
        .iter()
        .map(|stage| stage.run(solver, gas, loglevel))
        .collect()
}
