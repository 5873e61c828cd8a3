//! Reduced-order flame solver.
//!
//! `SurrogateFlame` stands in for a full one-dimensional flame code. Its
//! steady solution is an analytic flame profile whose propagation speed
//! comes from a methane-air burning-velocity correlation:
//!
//! ```text
//! S = W φ^η exp(-ξ (φ - 1.075)²) (T_u / 300 K)^2 (P / 1 atm)^-0.5 · K · F
//! ```
//!
//! `K = exp(½ mean(ln k_i(T_b) - ln k_i,ref(T_b)))` carries the kinetics:
//! forward rate constants at an estimated burned temperature, relative to
//! those of the mechanism the solver was created with. `F` accounts for
//! the transport, Soret and energy settings.
//!
//! The solve is a damped fixed-point relaxation toward that profile with a
//! weighted-error convergence test and a sweep cap per attempt, so a cold
//! start needs a retry just like the real thing.

use crate::error::{FlameError, FlameResult};
use crate::solver::{
    FlameBackend, FlameSolver, PerturbFn, RefineCriteria, TransportModel, UnknownLayout,
};
use ks_core::numeric::Tolerances;
use ks_core::units::constants::ONE_ATM_PA;
use ks_core::units::{Velocity, mps};
use ks_kinetics::Solution;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Correlation constants for methane-air.
const BURNING_VELOCITY_W: f64 = 0.422;
const BURNING_VELOCITY_ETA: f64 = 0.15;
const BURNING_VELOCITY_XI: f64 = 5.18;
const PEAK_EQUIVALENCE_RATIO: f64 = 1.075;
const REFERENCE_TEMPERATURE: f64 = 300.0;
const TEMPERATURE_EXPONENT: f64 = 2.0;
const PRESSURE_EXPONENT: f64 = -0.5;

/// Temperature rise of a stoichiometric flame [K].
const STOICHIOMETRIC_RISE: f64 = 1900.0;

const MIXTURE_AVERAGED_FACTOR: f64 = 0.98;
const SORET_FACTOR: f64 = 1.005;

/// Thermal diffusivity setting the flame thickness `δ = α / S` [m²/s].
const FLAME_DIFFUSIVITY: f64 = 1.0e-4;
/// Flame location as a fraction of the domain.
const FLAME_POSITION: f64 = 0.3;

const RELAXATION: f64 = 0.5;
const ATTEMPT_SWEEPS: usize = 14;
const REFINE_SWEEPS: usize = 40;
const MAX_REFINE_PASSES: usize = 40;
const MAX_POINTS: usize = 1000;
const MIN_SPACING: f64 = 1.0e-9;

/// Relative step for derivatives in [`FlameSolver::solve_adjoint`].
const ADJOINT_STEP: f64 = 1.0e-5;

/// Flame components before the species block: u, V, T, lambda.
const FLAME_FIELDS: usize = 4;
/// Inlet components before the species block: u, T.
const INLET_FIELDS: usize = 2;
const T_COMPONENT: usize = 2;
const LAMBDA_COMPONENT: usize = 3;

/// Adiabatic flame temperature estimate.
fn burned_temperature(t_unburned: f64, phi: f64) -> f64 {
    t_unburned + STOICHIOMETRIC_RISE * phi.min(1.0 / phi)
}

fn correlation_speed(t_unburned: f64, pressure: f64, phi: f64) -> f64 {
    let shape = phi.powf(BURNING_VELOCITY_ETA)
        * (-BURNING_VELOCITY_XI * (phi - PEAK_EQUIVALENCE_RATIO).powi(2)).exp();
    BURNING_VELOCITY_W
        * shape
        * (t_unburned / REFERENCE_TEMPERATURE).powf(TEMPERATURE_EXPONENT)
        * (pressure / ONE_ATM_PA).powf(PRESSURE_EXPONENT)
}

fn log_rates(gas: &Solution, t: f64) -> Vec<f64> {
    gas.rate_constants_at(t)
        .into_iter()
        .map(|k| if k > 0.0 && k.is_finite() { k.ln() } else { f64::NAN })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSolution {
    description: String,
    grid: Vec<f64>,
    state: Vec<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RestartFile {
    solutions: BTreeMap<String, StoredSolution>,
}

impl RestartFile {
    fn read(path: &Path) -> FlameResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, path: &Path) -> FlameResult<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GridChange {
    inserted: usize,
    pruned: usize,
}

/// Creates [`SurrogateFlame`] solvers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurrogateBackend;

impl FlameBackend for SurrogateBackend {
    type Gas = Solution;
    type Solver = SurrogateFlame;

    fn create(&self, gas: &Solution, grid: &[f64]) -> FlameResult<SurrogateFlame> {
        SurrogateFlame::new(gas, grid)
    }
}

#[derive(Debug, Clone)]
pub struct SurrogateFlame {
    n_species: usize,
    grid: Vec<f64>,
    state: DVector<f64>,
    solved: bool,
    reference_log_rates: Vec<f64>,
    energy: bool,
    transport: TransportModel,
    soret: bool,
    steady: Tolerances,
    transient: Tolerances,
    species_bounds: (f64, f64),
    jacobian_age: (u32, u32),
    time_step: (f64, Vec<u32>),
    refine: RefineCriteria,
}

impl SurrogateFlame {
    /// Solver for `gas` on `grid`, which must be strictly increasing with at
    /// least two points.
    pub fn new(gas: &Solution, grid: &[f64]) -> FlameResult<Self> {
        if grid.len() < 2 || grid.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FlameError::InvalidSetup {
                what: format!("grid of {} points is not strictly increasing", grid.len()),
            });
        }
        let phi = Self::equivalence_ratio(gas)?;
        let t_b = burned_temperature(gas.temperature(), phi);
        let mut flame = Self {
            n_species: gas.n_species(),
            grid: grid.to_vec(),
            state: DVector::zeros(0),
            solved: false,
            reference_log_rates: log_rates(gas, t_b),
            energy: true,
            transport: TransportModel::MixtureAveraged,
            soret: false,
            steady: Tolerances::new(1.0e-4, 1.0e-9),
            transient: Tolerances::new(1.0e-4, 1.0e-11),
            species_bounds: (-1.0e-5, 1.0),
            jacobian_age: (20, 20),
            time_step: (1.0e-6, vec![10]),
            refine: RefineCriteria::default(),
        };
        flame.state = DVector::zeros(flame.layout().total_unknowns());
        Ok(flame)
    }

    fn equivalence_ratio(gas: &Solution) -> FlameResult<f64> {
        match gas.equivalence_ratio() {
            Some(phi) if phi > 0.0 && phi.is_finite() => Ok(phi),
            _ => Err(FlameError::InvalidSetup {
                what: "mixture has no fuel or no oxygen".to_string(),
            }),
        }
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Settings factor applied on top of the correlation.
    fn physics_factor(&self, t_unburned: f64, t_burned: f64) -> f64 {
        let transport = match self.transport {
            TransportModel::MixtureAveraged => MIXTURE_AVERAGED_FACTOR,
            TransportModel::Multicomponent => 1.0,
        };
        let soret = if self.soret { SORET_FACTOR } else { 1.0 };
        let energy = if self.energy {
            1.0
        } else {
            (t_unburned / t_burned).sqrt()
        };
        transport * soret * energy
    }

    fn kinetic_factor(&self, gas: &Solution, t_burned: f64) -> f64 {
        let current = log_rates(gas, t_burned);
        let (sum, count) = current
            .iter()
            .zip(&self.reference_log_rates)
            .map(|(k, k_ref)| k - k_ref)
            .filter(|d| d.is_finite())
            .fold((0.0, 0usize), |(s, n), d| (s + d, n + 1));
        if count == 0 {
            1.0
        } else {
            (0.5 * sum / count as f64).exp()
        }
    }

    /// Burning velocity the relaxation converges to, in m/s.
    pub fn target_speed(&self, gas: &Solution) -> FlameResult<f64> {
        let t_u = gas.temperature();
        let phi = Self::equivalence_ratio(gas)?;
        let t_b = burned_temperature(t_u, phi);
        let speed = correlation_speed(t_u, gas.pressure(), phi)
            * self.kinetic_factor(gas, t_b)
            * self.physics_factor(t_u, t_b);
        if speed.is_finite() && speed > 0.0 {
            Ok(speed)
        } else {
            Err(FlameError::InvalidSetup {
                what: format!("non-physical burning velocity {speed}"),
            })
        }
    }

    /// Steady profile on the current grid.
    fn target_state(&self, gas: &Solution) -> FlameResult<DVector<f64>> {
        let speed = self.target_speed(gas)?;
        let t_u = gas.temperature();
        let t_b = if self.energy {
            burned_temperature(t_u, Self::equivalence_ratio(gas)?)
        } else {
            t_u
        };
        let layout = self.layout();
        let x = gas.mole_fractions();
        let mut target = DVector::zeros(layout.total_unknowns());

        target[0] = speed;
        target[1] = t_u;
        for (k, xk) in x.iter().enumerate() {
            target[INLET_FIELDS + k] = *xk;
        }

        let (start, end) = (self.grid[0], self.grid[self.grid.len() - 1]);
        let z_flame = start + FLAME_POSITION * (end - start);
        let thickness = FLAME_DIFFUSIVITY / speed;
        for (j, z) in self.grid.iter().enumerate() {
            let base = layout.inlet_components + j * layout.flame_components;
            let progress = 0.5 * (1.0 + ((z - z_flame) / thickness).tanh());
            let t = t_u + (t_b - t_u) * progress;
            target[base + UnknownLayout::VELOCITY_COMPONENT] = speed * t / t_u;
            target[base + T_COMPONENT] = t;
            target[base + LAMBDA_COMPONENT] = -speed * speed;
            for (k, xk) in x.iter().enumerate() {
                target[base + FLAME_FIELDS + k] = *xk;
            }
        }
        Ok(target)
    }

    /// Weighted maximum error; at most one means converged.
    fn error_norm(&self, target: &DVector<f64>) -> f64 {
        self.state
            .iter()
            .zip(target.iter())
            .map(|(x, t)| (t - x).abs() / (self.steady.rel * t.abs() + self.steady.abs))
            .fold(0.0, f64::max)
    }

    fn clamp_species(&mut self) {
        let layout = self.layout();
        let (lo, hi) = self.species_bounds;
        for j in 0..layout.flame_points {
            let base = layout.inlet_components + j * layout.flame_components + FLAME_FIELDS;
            for k in 0..self.n_species {
                let y = &mut self.state[base + k];
                *y = y.clamp(lo, hi);
            }
        }
    }

    fn relax(&mut self, gas: &Solution, max_sweeps: usize, loglevel: u32) -> FlameResult<()> {
        let target = self.target_state(gas)?;
        if self.state.len() != target.len() {
            self.state = DVector::zeros(target.len());
        }
        let mut err = self.error_norm(&target);
        let mut sweeps = 0;
        while err > 1.0 {
            if sweeps == max_sweeps {
                self.solved = false;
                return Err(FlameError::ConvergenceFailed {
                    what: format!(
                        "weighted error {err:.3e} after {sweeps} sweeps on {} points",
                        self.grid.len()
                    ),
                });
            }
            let step = RELAXATION * (&target - &self.state);
            self.state += step;
            self.clamp_species();
            err = self.error_norm(&target);
            sweeps += 1;
            if loglevel > 1 {
                tracing::trace!(sweep = sweeps, error = err, "relaxation sweep");
            }
        }
        if loglevel > 0 {
            tracing::debug!(sweeps, points = self.grid.len(), "relaxation converged");
        }
        self.solved = true;
        Ok(())
    }

    /// Velocity and temperature profiles at the flame points.
    fn profiles(&self) -> [Vec<f64>; 2] {
        let layout = self.layout();
        let column = |c: usize| {
            (0..layout.flame_points)
                .map(|j| self.state[layout.inlet_components + j * layout.flame_components + c])
                .collect::<Vec<f64>>()
        };
        [column(UnknownLayout::VELOCITY_COMPONENT), column(T_COMPONENT)]
    }

    /// Intervals to split and interior points to drop.
    fn assess_grid(&self) -> (Vec<bool>, Vec<bool>) {
        let n = self.grid.len();
        let h: Vec<f64> = self.grid.windows(2).map(|w| w[1] - w[0]).collect();
        let mut split = vec![false; n - 1];
        let mut prunable = vec![self.refine.prune > 0.0; n];
        prunable[0] = false;
        prunable[n - 1] = false;

        for f in self.profiles() {
            let (lo, hi) = f.iter().fold((f64::MAX, f64::MIN), |(a, b), v| (a.min(*v), b.max(*v)));
            let range = hi - lo;
            if range <= 1.0e-12 * hi.abs().max(1.0) {
                continue;
            }
            let slopes: Vec<f64> = (0..n - 1).map(|j| (f[j + 1] - f[j]) / h[j]).collect();
            let (slo, shi) = slopes
                .iter()
                .fold((f64::MAX, f64::MIN), |(a, b), v| (a.min(*v), b.max(*v)));
            let slope_range = (shi - slo).max(f64::MIN_POSITIVE);

            for j in 0..n - 1 {
                let jump = (f[j + 1] - f[j]).abs() / range;
                if jump > self.refine.slope {
                    split[j] = true;
                }
                if jump >= self.refine.prune {
                    prunable[j] = false;
                    prunable[j + 1] = false;
                }
            }
            for j in 1..n - 1 {
                let bend = (slopes[j] - slopes[j - 1]).abs() / slope_range;
                if bend > self.refine.curve {
                    split[j - 1] = true;
                    split[j] = true;
                }
                if bend >= self.refine.prune {
                    prunable[j] = false;
                }
            }
        }

        for j in 1..n - 1 {
            if h[j] / h[j - 1] > self.refine.ratio {
                split[j] = true;
            }
            if h[j - 1] / h[j] > self.refine.ratio {
                split[j - 1] = true;
            }
        }
        for (j, s) in split.iter_mut().enumerate() {
            if h[j] < 2.0 * MIN_SPACING {
                *s = false;
            }
        }
        (split, prunable)
    }

    fn merged_interval_ok(&self, j: usize, h: &[f64]) -> bool {
        let merged = h[j - 1] + h[j];
        let left_ok = j < 2 || merged / h[j - 2] <= self.refine.ratio;
        let right_ok = j + 1 >= h.len() || merged / h[j + 1] <= self.refine.ratio;
        left_ok && right_ok
    }

    /// Split steep intervals, or prune flat points when none are split.
    fn refine_grid(&mut self) -> GridChange {
        let (split, prunable) = self.assess_grid();
        let room = MAX_POINTS.saturating_sub(self.grid.len());
        let mut change = GridChange::default();
        let mut new_grid = Vec::with_capacity(self.grid.len() * 2);

        if split.iter().any(|s| *s) && room > 0 {
            for (j, z) in self.grid.iter().enumerate() {
                new_grid.push(*z);
                if j + 1 < self.grid.len() && split[j] && change.inserted < room {
                    new_grid.push(0.5 * (z + self.grid[j + 1]));
                    change.inserted += 1;
                }
            }
        } else {
            let h: Vec<f64> = self.grid.windows(2).map(|w| w[1] - w[0]).collect();
            let mut skip_next = false;
            for (j, z) in self.grid.iter().enumerate() {
                if !skip_next && prunable[j] && self.merged_interval_ok(j, &h) {
                    change.pruned += 1;
                    skip_next = true;
                    continue;
                }
                skip_next = false;
                new_grid.push(*z);
            }
        }

        if change.inserted + change.pruned > 0 {
            self.regrid(new_grid);
        }
        change
    }

    /// Move the solution onto `grid` by linear interpolation.
    fn regrid(&mut self, grid: Vec<f64>) {
        let old = self.layout();
        let old_grid = std::mem::replace(&mut self.grid, grid);
        let new = self.layout();
        let mut state = DVector::zeros(new.total_unknowns());

        for i in 0..old.inlet_components {
            state[i] = self.state[i];
        }
        let value = |j: usize, c: usize| self.state[old.inlet_components + j * old.flame_components + c];
        let mut seg = 0;
        for (j, z) in self.grid.iter().enumerate() {
            while seg + 2 < old_grid.len() && old_grid[seg + 1] < *z {
                seg += 1;
            }
            let w = ((z - old_grid[seg]) / (old_grid[seg + 1] - old_grid[seg])).clamp(0.0, 1.0);
            for c in 0..new.flame_components {
                state[new.inlet_components + j * new.flame_components + c] =
                    (1.0 - w) * value(seg, c) + w * value(seg + 1, c);
            }
        }
        let old_outlet = old.total_unknowns() - old.outlet_components;
        let new_outlet = new.total_unknowns() - new.outlet_components;
        for i in 0..new.outlet_components {
            state[new_outlet + i] = self.state[old_outlet + i];
        }
        self.state = state;
    }
}

impl FlameSolver for SurrogateFlame {
    type Gas = Solution;

    fn set_steady_tolerances(&mut self, tol: Tolerances) {
        self.steady = tol;
    }

    fn set_transient_tolerances(&mut self, tol: Tolerances) {
        self.transient = tol;
    }

    fn set_species_bounds(&mut self, lower: f64, upper: f64) {
        self.species_bounds = (lower, upper);
    }

    fn transport_model(&self) -> TransportModel {
        self.transport
    }

    fn set_transport_model(&mut self, model: TransportModel) {
        self.transport = model;
    }

    fn energy_enabled(&self) -> bool {
        self.energy
    }

    fn set_energy_enabled(&mut self, enabled: bool) {
        self.energy = enabled;
    }

    fn soret_enabled(&self) -> bool {
        self.soret
    }

    fn set_soret_enabled(&mut self, enabled: bool) {
        self.soret = enabled;
    }

    fn set_max_jac_age(&mut self, steady: u32, transient: u32) {
        self.jacobian_age = (steady, transient);
    }

    fn set_time_step(&mut self, initial: f64, schedule: &[u32]) {
        self.time_step = (initial, schedule.to_vec());
    }

    fn set_refine_criteria(&mut self, criteria: RefineCriteria) {
        self.refine = criteria;
    }

    fn solve(&mut self, gas: &Solution, loglevel: u32, refine_grid: bool) -> FlameResult<()> {
        if loglevel > 1 {
            tracing::debug!(
                jacobian_age = ?self.jacobian_age,
                time_step = ?self.time_step,
                transient_rtol = self.transient.rel,
                "surrogate solve settings"
            );
        }
        self.relax(gas, ATTEMPT_SWEEPS, loglevel)?;
        if !refine_grid {
            return Ok(());
        }
        for _ in 0..MAX_REFINE_PASSES {
            let change = self.refine_grid();
            if change.inserted + change.pruned == 0 {
                break;
            }
            if loglevel > 0 {
                tracing::debug!(
                    inserted = change.inserted,
                    pruned = change.pruned,
                    points = self.grid.len(),
                    "grid refined"
                );
            }
            self.relax(gas, REFINE_SWEEPS, loglevel)?;
            if change.inserted == 0 {
                break;
            }
        }
        Ok(())
    }

    fn save(&self, path: &Path, name: &str, description: &str) -> FlameResult<()> {
        if !self.solved {
            return Err(FlameError::NoSolution);
        }
        let mut file = RestartFile::read(path)?;
        file.solutions.insert(
            name.to_string(),
            StoredSolution {
                description: description.to_string(),
                grid: self.grid.clone(),
                state: self.state.iter().copied().collect(),
            },
        );
        file.write(path)?;
        tracing::debug!(path = %path.display(), name, "saved flame solution");
        Ok(())
    }

    fn restore(&mut self, path: &Path, name: &str) -> FlameResult<()> {
        let not_found = || FlameError::SolutionNotFound {
            path: path.to_path_buf(),
            name: name.to_string(),
        };
        if !path.exists() {
            return Err(not_found());
        }
        let stored = RestartFile::read(path)?
            .solutions
            .remove(name)
            .ok_or_else(not_found)?;
        let grid_len = stored.grid.len();
        let previous = std::mem::replace(&mut self.grid, stored.grid);
        if grid_len < 2 || stored.state.len() != self.layout().total_unknowns() {
            self.grid = previous;
            return Err(FlameError::InvalidSetup {
                what: format!("stored solution '{name}' does not match this mechanism"),
            });
        }
        self.state = DVector::from_vec(stored.state);
        self.solved = true;
        tracing::debug!(path = %path.display(), name, points = grid_len, "restored flame solution");
        Ok(())
    }

    fn inlet_velocity(&self) -> Velocity {
        let index = self.layout().flame_speed_index();
        mps(self.state.get(index).copied().unwrap_or(0.0))
    }

    fn layout(&self) -> UnknownLayout {
        UnknownLayout {
            inlet_components: INLET_FIELDS + self.n_species,
            flame_components: FLAME_FIELDS + self.n_species,
            flame_points: self.grid.len(),
            outlet_components: 1,
        }
    }

    fn solve_adjoint(
        &mut self,
        gas: &mut Solution,
        perturb: &mut PerturbFn<'_, Solution>,
        n_params: usize,
        dgdx: &DVector<f64>,
    ) -> FlameResult<DVector<f64>> {
        if !self.solved {
            return Err(FlameError::NoSolution);
        }
        let n = self.layout().total_unknowns();
        if dgdx.len() != n {
            return Err(FlameError::InvalidSetup {
                what: format!("objective gradient has {} entries, expected {n}", dgdx.len()),
            });
        }

        let mut derivatives = DVector::zeros(n_params);
        for i in 0..n_params {
            let plus = perturb(gas, i, ADJOINT_STEP)
                .map_err(FlameError::from)
                .and_then(|()| self.target_state(gas));
            let minus = plus.and_then(|plus| {
                perturb(gas, i, -ADJOINT_STEP)?;
                Ok((plus, self.target_state(gas)?))
            });
            perturb(gas, i, 0.0)?;
            let (plus, minus) = minus?;
            derivatives[i] = dgdx.dot(&(plus - minus)) / (2.0 * ADJOINT_STEP);
        }
        Ok(derivatives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_core::linspace;
    use ks_core::units::{atm, k, to_mps};
    use ks_kinetics::{Composition, Kinetics};

    const MECH: &str = r#"
species:
- name: CH4
  composition: {C: 1, H: 4}
- name: O2
  composition: {O: 2}
- name: N2
  composition: {N: 2}
- name: O
  composition: {O: 1}
- name: OH
  composition: {O: 1, H: 1}
- name: CH3
  composition: {C: 1, H: 3}
reactions:
- equation: O + CH4 <=> OH + CH3
  rate-constant: {A: 1.02e9, b: 1.5, Ea: 8600}
- equation: 2 O + M <=> O2 + M
  rate-constant: {A: 1.2e17, b: -1.0, Ea: 0.0}
"#;

    fn gas(t: f64, p_atm: f64, comp: &str) -> Solution {
        let mut gas = Solution::from_yaml_str(MECH).unwrap();
        gas.set_state(k(t), atm(p_atm), &Composition::parse(comp).unwrap())
            .unwrap();
        gas
    }

    fn stoichiometric() -> Solution {
        gas(300.0, 1.0, "CH4:1, O2:2, N2:7.52")
    }

    fn full_physics(flame: &mut SurrogateFlame) {
        flame.set_steady_tolerances(Tolerances::new(1.0e-5, 1.0e-12));
        flame.set_transport_model(TransportModel::Multicomponent);
        flame.set_soret_enabled(true);
    }

    #[test]
    fn stoichiometric_speed_near_forty_cm_per_s() {
        let gas = stoichiometric();
        let mut flame = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 10)).unwrap();
        full_physics(&mut flame);
        let s = flame.target_speed(&gas).unwrap();
        assert!(s > 0.35 && s < 0.45, "{s}");
    }

    #[test]
    fn speed_peaks_near_stoichiometric() {
        let lean = gas(300.0, 1.0, "CH4:0.7, O2:2, N2:7.52");
        let rich = gas(300.0, 1.0, "CH4:1.4, O2:2, N2:7.52");
        let stoich = stoichiometric();
        let grid = linspace(0.0, 1.0, 10);
        let s = |g: &Solution| SurrogateFlame::new(g, &grid).unwrap().target_speed(g).unwrap();
        assert!(s(&stoich) > s(&lean));
        assert!(s(&stoich) > s(&rich));
    }

    #[test]
    fn rejects_oxygen_free_mixture() {
        let g = gas(300.0, 1.0, "CH4:1, N2:1");
        assert!(matches!(
            SurrogateFlame::new(&g, &linspace(0.0, 1.0, 5)),
            Err(FlameError::InvalidSetup { .. })
        ));
    }

    #[test]
    fn cold_solve_needs_a_second_attempt() {
        let gas = stoichiometric();
        let mut flame = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 10)).unwrap();
        full_physics(&mut flame);
        assert!(matches!(
            flame.solve(&gas, 0, false),
            Err(FlameError::ConvergenceFailed { .. })
        ));
        flame.solve(&gas, 0, false).unwrap();
        let u = to_mps(flame.inlet_velocity());
        let s = flame.target_speed(&gas).unwrap();
        assert!((u / s - 1.0).abs() < 1e-4);
    }

    #[test]
    fn refinement_clusters_points_at_the_flame() {
        let gas = stoichiometric();
        let mut flame = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 10)).unwrap();
        full_physics(&mut flame);
        flame.set_refine_criteria(RefineCriteria::new(10.0, 0.06, 0.08, 0.0));
        let _ = flame.solve(&gas, 0, false);
        flame.solve(&gas, 0, true).unwrap();

        let grid = flame.grid().to_vec();
        assert!(grid.len() > 10);
        assert_eq!(grid[0], 0.0);
        assert_eq!(*grid.last().unwrap(), 1.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
        let near_flame = grid.iter().filter(|z| (**z - 0.3).abs() < 0.01).count();
        assert!(near_flame > 5, "{near_flame} points near the flame");
    }

    #[test]
    fn save_and_restore_round_trip() {
        let gas = stoichiometric();
        let path = std::env::temp_dir().join("ks_flame_surrogate_restart.json");
        let _ = fs::remove_file(&path);

        let mut flame = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 10)).unwrap();
        full_physics(&mut flame);
        assert!(matches!(flame.save(&path, "restart", "x"), Err(FlameError::NoSolution)));
        let _ = flame.solve(&gas, 0, false);
        flame.solve(&gas, 0, false).unwrap();
        flame.save(&path, "restart", "baseline").unwrap();
        let u = to_mps(flame.inlet_velocity());

        let mut other = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 4)).unwrap();
        assert!(matches!(
            other.restore(&path, "missing"),
            Err(FlameError::SolutionNotFound { .. })
        ));
        other.restore(&path, "restart").unwrap();
        assert_eq!(other.grid().len(), 10);
        assert_eq!(to_mps(other.inlet_velocity()), u);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn adjoint_restores_parameters() {
        let mut gas = stoichiometric();
        let mut flame = SurrogateFlame::new(&gas, &linspace(0.0, 1.0, 10)).unwrap();
        full_physics(&mut flame);
        let _ = flame.solve(&gas, 0, false);
        flame.solve(&gas, 0, false).unwrap();

        let base = gas.reaction(0).unwrap();
        let layout = flame.layout();
        let mut dgdx = DVector::zeros(layout.total_unknowns());
        dgdx[layout.flame_speed_index()] = 1.0;
        let mut perturb = |g: &mut Solution, _i: usize, dp: f64| -> ks_model::ModelResult<()> {
            let mut rxn = base.clone();
            let rate = *rxn.rate().unwrap();
            rxn.set_rate(rate.with_pre_exponential_factor(rate.pre_exponential_factor * (1.0 + dp)))?;
            g.modify_reaction(0, rxn)?;
            Ok(())
        };
        let sens = flame.solve_adjoint(&mut gas, &mut perturb, 1, &dgdx).unwrap();

        let su = to_mps(flame.inlet_velocity());
        // Two reactions share the kinetic factor evenly.
        assert!((sens[0] / su - 0.25).abs() < 1e-4, "{}", sens[0] / su);
        assert_eq!(gas.reaction(0).unwrap(), base);
    }
}
