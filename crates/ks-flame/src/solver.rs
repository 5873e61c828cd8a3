//! Interface to a freely propagating, one-dimensional flame solver.

use crate::error::FlameResult;
use ks_core::numeric::Tolerances;
use ks_core::units::Velocity;
use ks_kinetics::Kinetics;
use ks_model::ModelResult;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportModel {
    MixtureAveraged,
    Multicomponent,
}

/// Grid refinement thresholds.
///
/// `slope` and `curve` are fractions of the full range of a profile;
/// `ratio` bounds the size ratio of adjacent intervals. Points whose
/// neighbouring changes fall below `prune` may be removed; zero disables
/// pruning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefineCriteria {
    pub ratio: f64,
    pub slope: f64,
    pub curve: f64,
    pub prune: f64,
}

impl RefineCriteria {
    pub const fn new(ratio: f64, slope: f64, curve: f64, prune: f64) -> Self {
        Self {
            ratio,
            slope,
            curve,
            prune,
        }
    }
}

impl Default for RefineCriteria {
    fn default() -> Self {
        Self::new(10.0, 0.8, 0.8, 0.0)
    }
}

/// Sizes of the solver's domains, in the order unknowns are stored:
/// inlet, flame points, outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownLayout {
    pub inlet_components: usize,
    pub flame_components: usize,
    pub flame_points: usize,
    pub outlet_components: usize,
}

impl UnknownLayout {
    /// Offset of the axial velocity within one flame point.
    pub const VELOCITY_COMPONENT: usize = 0;

    pub fn total_unknowns(&self) -> usize {
        self.inlet_components + self.flame_components * self.flame_points + self.outlet_components
    }

    pub fn component_index(&self, name: &str) -> Option<usize> {
        match name {
            "u" => Some(Self::VELOCITY_COMPONENT),
            "V" => Some(1),
            "T" => Some(2),
            "lambda" => Some(3),
            _ => None,
        }
    }

    /// Unknown holding the velocity at the first flame point.
    pub fn flame_speed_index(&self) -> usize {
        self.inlet_components + Self::VELOCITY_COMPONENT
    }
}

/// Perturbation hook handed to [`FlameSolver::solve_adjoint`]: scales the
/// i-th requested parameter by `1 + delta` relative to its base value.
pub type PerturbFn<'a, G> = dyn FnMut(&mut G, usize, f64) -> ModelResult<()> + 'a;

pub trait FlameSolver {
    type Gas: Kinetics;

    fn set_steady_tolerances(&mut self, tol: Tolerances);

    fn set_transient_tolerances(&mut self, tol: Tolerances);

    fn set_species_bounds(&mut self, lower: f64, upper: f64);

    fn transport_model(&self) -> TransportModel;

    fn set_transport_model(&mut self, model: TransportModel);

    fn energy_enabled(&self) -> bool;

    fn set_energy_enabled(&mut self, enabled: bool);

    fn soret_enabled(&self) -> bool;

    fn set_soret_enabled(&mut self, enabled: bool);

    fn set_max_jac_age(&mut self, steady: u32, transient: u32);

    fn set_time_step(&mut self, initial: f64, schedule: &[u32]);

    fn set_refine_criteria(&mut self, criteria: RefineCriteria);

    /// Solve for the steady flame, continuing from the current solution.
    fn solve(&mut self, gas: &Self::Gas, loglevel: u32, refine_grid: bool) -> FlameResult<()>;

    fn save(&self, path: &Path, name: &str, description: &str) -> FlameResult<()>;

    fn restore(&mut self, path: &Path, name: &str) -> FlameResult<()>;

    /// Axial velocity at the first flame point.
    fn inlet_velocity(&self) -> Velocity;

    fn layout(&self) -> UnknownLayout;

    /// Derivatives `dg/dp_i` of an objective with gradient `dgdx` with
    /// respect to `n_params` parameters, each addressed through `perturb`.
    fn solve_adjoint(
        &mut self,
        gas: &mut Self::Gas,
        perturb: &mut PerturbFn<'_, Self::Gas>,
        n_params: usize,
        dgdx: &DVector<f64>,
    ) -> FlameResult<DVector<f64>>;
}

/// Builds solvers for a mechanism on a given initial grid.
pub trait FlameBackend {
    type Gas: Kinetics;
    type Solver: FlameSolver<Gas = Self::Gas>;

    fn create(&self, gas: &Self::Gas, grid: &[f64]) -> FlameResult<Self::Solver>;
}
