//! Flame speed sensitivities from the solver's adjoint.
//!
//! One forward solve, then a single adjoint solve for all requested
//! parameters. The objective is the velocity at the first flame point, so
//! its gradient is one-hot over the solver unknowns.

use crate::flame_speed::FlameSpeed;
use crate::solver::{FlameBackend, FlameSolver};
use ks_core::units::to_mps;
use ks_kinetics::MechanismLoader;
use ks_model::accessor::{get_parameter, set_parameter};
use ks_model::sensitivity::{write_adjoint_header, write_adjoint_line};
use ks_model::{ChemistryModel, ModelError, ModelResult, SensitivityReport};
use nalgebra::DVector;
use std::io::Write;

/// Reject ids the adjoint path cannot perturb multiplicatively.
fn check_ids<M: ChemistryModel + ?Sized>(model: &M, parameter_ids: &[usize]) -> ModelResult<()> {
    for &id in parameter_ids {
        let desc = model.model_parameter_info(id)?;
        if desc.kind.is_energy() {
            return Err(ModelError::UnsupportedAdjointParameter {
                id,
                name: desc.name.clone(),
            });
        }
    }
    Ok(())
}

/// The solver must return one derivative per requested parameter.
fn check_adjoint_len(raw: &DVector<f64>, expected: usize) -> ModelResult<()> {
    if raw.len() == expected {
        Ok(())
    } else {
        Err(ModelError::Backend {
            message: format!(
                "adjoint solve returned {} derivatives for {expected} parameters",
                raw.len()
            ),
        })
    }
}

/// `d ln(S_u) / d ln(p)` for each requested parameter.
///
/// `perturbation` is accepted for signature compatibility with the
/// finite-difference path; the step is chosen by the solver.
pub fn adjoint_sensitivity<L, B>(
    model: &mut FlameSpeed<L, B>,
    perturbation: f64,
    parameter_ids: &[usize],
    log: &mut dyn Write,
) -> ModelResult<SensitivityReport>
where
    L: MechanismLoader,
    B: FlameBackend<Gas = L::Gas>,
{
    check_ids(&*model, parameter_ids)?;

    let evaluation = model.evaluate()?;
    let couple = model.core().filter().no_falloff;
    let (catalog, gas, solver) = model.core_mut().parts_mut()?;

    let layout = solver.layout();
    let mut dgdx = DVector::zeros(layout.total_unknowns());
    dgdx[layout.flame_speed_index()] = 1.0;
    let su0 = to_mps(solver.inlet_velocity());
    if !(su0.is_finite() && su0 != 0.0) {
        return Err(ModelError::InvalidValue {
            what: "baseline flame speed",
            value: su0,
        });
    }

    let bases = parameter_ids
        .iter()
        .map(|&id| get_parameter(&*gas, catalog, id))
        .collect::<ModelResult<Vec<f64>>>()?;
    let mut perturb = |g: &mut L::Gas, i: usize, delta: f64| -> ModelResult<()> {
        set_parameter(g, catalog, parameter_ids[i], bases[i] * (1.0 + delta), couple)
    };

    let raw = solver.solve_adjoint(gas, &mut perturb, parameter_ids.len(), &dgdx)?;
    check_adjoint_len(&raw, parameter_ids.len())?;
    let coefficients: Vec<f64> = raw.iter().map(|d| d / su0).collect();

    tracing::info!(
        value = evaluation.value,
        status = %evaluation.status,
        parameters = parameter_ids.len(),
        perturbation,
        "adjoint sensitivity"
    );
    write_adjoint_header(log)?;
    for (&id, s) in parameter_ids.iter().zip(&coefficients) {
        write_adjoint_line(log, id, *s, &catalog.get(id)?.name)?;
    }

    Ok(SensitivityReport {
        value: evaluation.value,
        statuses: vec![evaluation.status; coefficients.len()],
        coefficients,
    })
}
