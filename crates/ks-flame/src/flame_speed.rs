//! Laminar flame speed model.

use crate::adjoint;
use crate::continuation::{self, SolvePath};
use crate::error::{FlameError, FlameResult};
use crate::solver::{FlameBackend, FlameSolver};
use crate::surrogate::SurrogateBackend;
use ks_core::linspace;
use ks_core::numeric::{Tolerances, ensure_positive};
use ks_core::units::to_cm_per_s;
use ks_kinetics::{Composition, MechanismLoader, YamlMechanismLoader};
use ks_model::sensitivity::finite_difference;
use ks_model::{
    CatalogFilter, ChemistryModel, Evaluation, GasOf, InitialState, ModelCore, ModelResult,
    SensitivityReport, SolveMode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name under which the baseline solution is kept in the restart file.
pub const RESTART_SOLUTION: &str = "restart";
const RESTART_DESCRIPTION: &str = "Base solution for this flame speed";

const STEADY_TOLERANCES: Tolerances = Tolerances::new(1.0e-5, 1.0e-12);
const TRANSIENT_TOLERANCES: Tolerances = Tolerances::new(1.0e-4, 1.0e-12);
const SPECIES_BOUNDS: (f64, f64) = (-1.0e-5, 1.0);

/// Algorithm behind [`ChemistryModel::sensitivity`] for flame speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMethod {
    FiniteDifference,
    #[default]
    Adjoint,
}

fn default_domain_length() -> f64 {
    1.0
}

fn default_initial_points() -> usize {
    10
}

fn default_loglevel() -> u32 {
    2
}

fn default_name() -> String {
    "soln".to_string()
}

fn default_true() -> bool {
    true
}

/// Flame speed model settings.
///
/// ```yaml
/// temperature_k: 300.0
/// pressure_atm: 1.0
/// composition: "CH4:1, O2:2, N2:7.52"
/// mechanism: mechanisms/methane.yaml
/// initial_points: 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlameSpeedConfig {
    pub temperature_k: f64,
    pub pressure_atm: f64,
    pub composition: Composition,
    pub mechanism: PathBuf,
    #[serde(default = "default_domain_length")]
    pub domain_length_m: f64,
    #[serde(default = "default_initial_points")]
    pub initial_points: usize,
    #[serde(default = "default_loglevel")]
    pub loglevel: u32,
    /// Restart file stem; solutions go to `<name>.json`.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub no_efficiencies: bool,
    #[serde(default = "default_true")]
    pub no_energy: bool,
    #[serde(default = "default_true")]
    pub no_falloff: bool,
    #[serde(default)]
    pub sensitivity_method: SensitivityMethod,
}

impl FlameSpeedConfig {
    pub fn new(
        temperature_k: f64,
        pressure_atm: f64,
        composition: Composition,
        mechanism: impl Into<PathBuf>,
    ) -> Self {
        Self {
            temperature_k,
            pressure_atm,
            composition,
            mechanism: mechanism.into(),
            domain_length_m: default_domain_length(),
            initial_points: default_initial_points(),
            loglevel: default_loglevel(),
            name: default_name(),
            no_efficiencies: true,
            no_energy: true,
            no_falloff: true,
            sensitivity_method: SensitivityMethod::default(),
        }
    }

    pub fn from_yaml_str(text: &str) -> FlameResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> FlameResult<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    pub fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            no_efficiencies: self.no_efficiencies,
            no_energy: self.no_energy,
            no_falloff: self.no_falloff,
        }
    }

    pub fn restart_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.json", self.name))
    }
}

/// Freely propagating premixed flame; the model value is the burning
/// velocity in cm/s.
#[derive(Serialize)]
#[serde(bound(serialize = ""))]
pub struct FlameSpeed<L, B>
where
    L: MechanismLoader,
    B: FlameBackend<Gas = L::Gas>,
{
    core: ModelCore<L, B::Solver>,
    #[serde(skip)]
    backend: B,
    initial_grid: Vec<f64>,
    loglevel: u32,
    savefile: PathBuf,
    restart: Option<bool>,
    sensitivity_method: SensitivityMethod,
    #[serde(skip)]
    last_solve: Option<Evaluation>,
}

/// Flame speed over YAML mechanisms with the reduced-order solver.
pub type SurrogateFlameSpeed = FlameSpeed<YamlMechanismLoader, SurrogateBackend>;

impl SurrogateFlameSpeed {
    pub fn surrogate(config: &FlameSpeedConfig) -> FlameResult<Self> {
        Self::new(YamlMechanismLoader, SurrogateBackend, config)
    }
}

impl<L, B> FlameSpeed<L, B>
where
    L: MechanismLoader,
    B: FlameBackend<Gas = L::Gas>,
{
    /// Build the model and its parameter catalog. Chemistry is created on
    /// first evaluation.
    pub fn new(loader: L, backend: B, config: &FlameSpeedConfig) -> FlameResult<Self> {
        let length = ensure_positive(config.domain_length_m, "domain length")?;
        if config.initial_points < 2 {
            return Err(FlameError::InvalidSetup {
                what: format!("{} initial grid points", config.initial_points),
            });
        }
        let initial = InitialState::new(
            config.temperature_k,
            config.pressure_atm,
            config.composition.clone(),
        )?;
        let core = ModelCore::new(loader, &config.mechanism, initial, config.filter())?;
        Ok(Self {
            core,
            backend,
            initial_grid: linspace(0.0, length, config.initial_points),
            loglevel: config.loglevel,
            savefile: config.restart_path(),
            restart: None,
            sensitivity_method: config.sensitivity_method,
            last_solve: None,
        })
    }

    pub fn with_sensitivity_method(mut self, method: SensitivityMethod) -> Self {
        self.sensitivity_method = method;
        self
    }

    pub fn sensitivity_method(&self) -> SensitivityMethod {
        self.sensitivity_method
    }

    pub fn initial_grid(&self) -> &[f64] {
        &self.initial_grid
    }

    pub fn savefile(&self) -> &Path {
        &self.savefile
    }

    pub fn has_restart(&self) -> bool {
        self.restart.is_some()
    }

    /// Record of the most recent evaluation.
    pub fn last_solve(&self) -> Option<&Evaluation> {
        self.last_solve.as_ref()
    }

    /// The live flame solver, once chemistry is initialized.
    pub fn solver(&self) -> ModelResult<&B::Solver> {
        self.core.chemistry().reactor()
    }
}

impl<L, B> fmt::Display for FlameSpeed<L, B>
where
    L: MechanismLoader,
    B: FlameBackend<Gas = L::Gas>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initial = self.core.initial();
        write!(
            f,
            "Laminar flame speed: {:8.0} K, {:5.2} kPa, {}",
            initial.temperature_k(),
            initial.pressure_pa() / 1.0e3,
            initial.composition()
        )
    }
}

impl<L, B> ChemistryModel for FlameSpeed<L, B>
where
    L: MechanismLoader,
    B: FlameBackend<Gas = L::Gas>,
{
    type Loader = L;
    type Reactor = B::Solver;

    fn core(&self) -> &ModelCore<L, B::Solver> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore<L, B::Solver> {
        &mut self.core
    }

    fn initialize_reactor(&self, gas: &GasOf<Self>) -> ModelResult<B::Solver> {
        let mut solver = self.backend.create(gas, &self.initial_grid)?;
        solver.set_steady_tolerances(STEADY_TOLERANCES);
        solver.set_transient_tolerances(TRANSIENT_TOLERANCES);
        solver.set_species_bounds(SPECIES_BOUNDS.0, SPECIES_BOUNDS.1);
        Ok(solver)
    }

    fn evaluate_in(&mut self, mode: SolveMode) -> ModelResult<Evaluation> {
        self.initialize_chemistry()?;
        let path = SolvePath::select(self.restart.is_some(), mode);
        let (_, gas, solver) = self.core.parts_mut()?;

        if path == SolvePath::Restart {
            solver.restore(&self.savefile, RESTART_SOLUTION)?;
        }
        let stages = continuation::run_path(path, solver, gas, self.loglevel);
        let value = to_cm_per_s(solver.inlet_velocity());

        let evaluation = Evaluation::from_stages(value, path.as_str(), stages);
        tracing::info!(
            path = path.as_str(),
            status = %evaluation.status,
            flame_speed_cm_s = value,
            "flame speed evaluated"
        );
        self.last_solve = Some(evaluation.clone());
        Ok(evaluation)
    }

    fn load_restart(&mut self) -> ModelResult<()> {
        let solver = self.core.chemistry_mut().reactor_mut()?;
        solver.restore(&self.savefile, RESTART_SOLUTION)?;
        self.restart = Some(true);
        Ok(())
    }

    fn save_restart(&mut self) -> ModelResult<()> {
        let solver = self.core.chemistry_mut().reactor_mut()?;
        solver.save(&self.savefile, RESTART_SOLUTION, RESTART_DESCRIPTION)?;
        self.restart = Some(true);
        tracing::debug!(path = %self.savefile.display(), "saved restart solution");
        Ok(())
    }

    fn ignore_restart(&mut self) {
        self.restart = None;
    }

    /// Keep the current solution as a restart, then drop the chemistry.
    fn prepare_for_save(&mut self) -> ModelResult<()> {
        if let Err(e) = self.save_restart() {
            tracing::warn!(error = %e, "no data saved from flame speed solution");
        }
        self.blank_chemistry();
        Ok(())
    }

    fn sensitivity(
        &mut self,
        perturbation: f64,
        parameter_ids: &[usize],
        log: &mut dyn Write,
    ) -> ModelResult<SensitivityReport> {
        match self.sensitivity_method {
            SensitivityMethod::FiniteDifference => {
                finite_difference(self, perturbation, parameter_ids, log)
            }
            SensitivityMethod::Adjoint => {
                adjoint::adjoint_sensitivity(self, perturbation, parameter_ids, log)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_yaml() {
        let cfg = FlameSpeedConfig::from_yaml_str(
            r#"
temperature_k: 300
pressure_atm: 1.0
composition: "CH4:1, O2:2, N2:7.52"
mechanism: gri.yaml
"#,
        )
        .unwrap();
        assert_eq!(cfg.domain_length_m, 1.0);
        assert_eq!(cfg.initial_points, 10);
        assert_eq!(cfg.loglevel, 2);
        assert_eq!(cfg.restart_path(), PathBuf::from("soln.json"));
        assert_eq!(cfg.filter(), CatalogFilter::default());
        assert_eq!(cfg.sensitivity_method, SensitivityMethod::Adjoint);
    }

    #[test]
    fn config_overrides() {
        let cfg = FlameSpeedConfig::from_yaml_str(
            r#"
temperature_k: 400
pressure_atm: 2.0
composition: {CH4: 1, O2: 2}
mechanism: gri.yaml
no_falloff: false
sensitivity_method: finite_difference
name: lean
"#,
        )
        .unwrap();
        assert!(!cfg.no_falloff && cfg.no_energy);
        assert_eq!(cfg.sensitivity_method, SensitivityMethod::FiniteDifference);
        assert_eq!(cfg.restart_path(), PathBuf::from("lean.json"));
    }
}
