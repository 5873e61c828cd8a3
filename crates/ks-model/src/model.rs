//! The parameterized chemistry model.
//!
//! [`ChemistryModel`] composes the catalog, the parameter accessor and the
//! chemistry lifecycle; implementors supply the reactor and the solve.

use crate::accessor;
use crate::catalog::{CatalogFilter, ParameterCatalog, ParameterDescriptor, build_catalog};
use crate::error::ModelResult;
use crate::lifecycle::Lifecycle;
use crate::sensitivity::{self, SensitivityReport};
use crate::state::InitialState;
use ks_kinetics::MechanismLoader;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Whether a solve is part of a sensitivity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SolveMode {
    #[default]
    Standard,
    Sensitivity,
}

/// Aggregate outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConvergenceStatus {
    Converged,
    ConvergedWithRetry,
    NonConvergent,
}

impl ConvergenceStatus {
    /// The less favourable of two outcomes.
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// Short tag used in sensitivity logs.
    pub fn tag(self) -> &'static str {
        match self {
            ConvergenceStatus::Converged => "ok",
            ConvergenceStatus::ConvergedWithRetry => "retry",
            ConvergenceStatus::NonConvergent => "FAIL",
        }
    }

    pub fn from_stages(stages: &[StageOutcome]) -> Self {
        stages
            .iter()
            .map(StageOutcome::status)
            .fold(ConvergenceStatus::Converged, ConvergenceStatus::worst)
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Result of one stage of a staged solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: String,
    pub attempts: u32,
    pub converged: bool,
}

impl StageOutcome {
    pub fn status(&self) -> ConvergenceStatus {
        match (self.converged, self.attempts) {
            (false, _) => ConvergenceStatus::NonConvergent,
            (true, 0 | 1) => ConvergenceStatus::Converged,
            (true, _) => ConvergenceStatus::ConvergedWithRetry,
        }
    }
}

/// Model output with its convergence record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub value: f64,
    pub status: ConvergenceStatus,
    /// Name of the solve strategy taken.
    pub path: String,
    pub stages: Vec<StageOutcome>,
}

impl Evaluation {
    /// A value computed without any staged solve.
    pub fn direct(value: f64) -> Self {
        Self {
            value,
            status: ConvergenceStatus::Converged,
            path: "direct".to_string(),
            stages: Vec::new(),
        }
    }

    pub fn from_stages(value: f64, path: impl Into<String>, stages: Vec<StageOutcome>) -> Self {
        Self {
            value,
            status: ConvergenceStatus::from_stages(&stages),
            path: path.into(),
            stages,
        }
    }
}

/// State shared by every chemistry model.
///
/// The catalog and loader are rebuilt at construction and never serialized.
#[derive(Serialize)]
#[serde(bound(serialize = ""))]
pub struct ModelCore<L: MechanismLoader, R> {
    initial: InitialState,
    mechanism: PathBuf,
    filter: CatalogFilter,
    #[serde(skip)]
    catalog: ParameterCatalog,
    #[serde(skip)]
    loader: L,
    chemistry: Lifecycle<L::Gas, R>,
}

impl<L: MechanismLoader, R> ModelCore<L, R> {
    /// Build the parameter catalog from a scratch load of `mechanism`, then
    /// check that the mechanism accepts `initial`.
    ///
    /// The checking load is dropped again, so no live chemistry exists until
    /// the model is first initialized.
    pub fn new(
        loader: L,
        mechanism: impl Into<PathBuf>,
        initial: InitialState,
        filter: CatalogFilter,
    ) -> ModelResult<Self> {
        let mechanism = mechanism.into();
        let catalog = build_catalog(&loader, &mechanism, filter)?;
        let core = Self {
            initial,
            mechanism,
            filter,
            catalog,
            loader,
            chemistry: Lifecycle::new(),
        };
        drop(core.load_gas()?);
        Ok(core)
    }

    pub fn initial(&self) -> &InitialState {
        &self.initial
    }

    pub fn mechanism_path(&self) -> &Path {
        &self.mechanism
    }

    pub fn filter(&self) -> CatalogFilter {
        self.filter
    }

    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn chemistry(&self) -> &Lifecycle<L::Gas, R> {
        &self.chemistry
    }

    pub fn chemistry_mut(&mut self) -> &mut Lifecycle<L::Gas, R> {
        &mut self.chemistry
    }

    /// Catalog together with the live mechanism and reactor.
    pub fn parts_mut(&mut self) -> ModelResult<(&ParameterCatalog, &mut L::Gas, &mut R)> {
        let (gas, reactor) = self.chemistry.split_mut()?;
        Ok((&self.catalog, gas, reactor))
    }

    /// Fresh, independent mechanism with the initial state applied.
    pub fn load_gas(&self) -> ModelResult<L::Gas> {
        let mut gas = self.loader.load(&self.mechanism)?;
        self.initial.apply(&mut gas)?;
        Ok(gas)
    }

    /// Reapply the initial state to the live mechanism.
    pub fn reapply_state(&mut self) -> ModelResult<()> {
        let gas = self.chemistry.gas_mut()?;
        self.initial.apply(gas)
    }
}

pub type GasOf<M> = <<M as ChemistryModel>::Loader as MechanismLoader>::Gas;

/// A model whose scalar output depends on reaction-rate parameters.
pub trait ChemistryModel {
    type Loader: MechanismLoader;
    type Reactor;

    fn core(&self) -> &ModelCore<Self::Loader, Self::Reactor>;

    fn core_mut(&mut self) -> &mut ModelCore<Self::Loader, Self::Reactor>;

    /// Build the reactor for a freshly loaded mechanism.
    fn initialize_reactor(&self, gas: &GasOf<Self>) -> ModelResult<Self::Reactor>;

    /// Compute the model value. Implementations initialize the chemistry
    /// themselves when it is blank.
    fn evaluate_in(&mut self, mode: SolveMode) -> ModelResult<Evaluation>;

    fn evaluate(&mut self) -> ModelResult<Evaluation> {
        self.evaluate_in(SolveMode::Standard)
    }

    /// Construct mechanism and reactor together if blank, otherwise only
    /// reapply the initial state.
    fn initialize_chemistry(&mut self) -> ModelResult<()> {
        if !self.core().chemistry().is_blank() {
            return self.core_mut().reapply_state();
        }
        let gas = self.core().load_gas()?;
        let reactor = self.initialize_reactor(&gas)?;
        self.core_mut().chemistry_mut().attach(gas, reactor);
        tracing::debug!(
            mechanism = %self.core().mechanism_path().display(),
            "chemistry initialized"
        );
        Ok(())
    }

    fn blank_chemistry(&mut self) {
        self.core_mut().chemistry_mut().blank();
    }

    /// Discard all perturbations by rebuilding the chemistry.
    fn reset_model(&mut self) -> ModelResult<()> {
        self.blank_chemistry();
        self.initialize_chemistry()
    }

    fn get_parameter(&self, id: usize) -> ModelResult<f64> {
        let core = self.core();
        accessor::get_parameter(core.chemistry().gas()?, core.catalog(), id)
    }

    /// Write parameter `id`. The low-pressure A-factor follows the
    /// high-pressure one when falloff parameters are excluded.
    fn perturb_parameter(&mut self, id: usize, value: f64) -> ModelResult<()> {
        let core = self.core_mut();
        let couple = core.filter().no_falloff;
        let ModelCore {
            catalog, chemistry, ..
        } = core;
        accessor::set_parameter(chemistry.gas_mut()?, catalog, id, value, couple)
    }

    fn parameter_catalog(&self) -> &ParameterCatalog {
        self.core().catalog()
    }

    fn model_parameter_info(&self, id: usize) -> ModelResult<&ParameterDescriptor> {
        self.core().catalog().get(id)
    }

    fn number_parameters(&self) -> usize {
        self.core().catalog().len()
    }

    fn load_restart(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn save_restart(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn ignore_restart(&mut self) {}

    /// Detach live chemistry so the model can be serialized.
    fn prepare_for_save(&mut self) -> ModelResult<()> {
        self.blank_chemistry();
        Ok(())
    }

    /// Central-difference sensitivities of the model value.
    fn sensitivity(
        &mut self,
        perturbation: f64,
        parameter_ids: &[usize],
        log: &mut dyn Write,
    ) -> ModelResult<SensitivityReport>
    where
        Self: Sized,
    {
        sensitivity::finite_difference(self, perturbation, parameter_ids, log)
    }
}
