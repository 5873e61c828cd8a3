//! Sensitivity coefficients and the fixed-width sensitivity log.
//!
//! Coefficients are normalized logarithmic derivatives,
//! `d ln(value) / d ln(parameter)`.

use crate::catalog::ParameterCatalog;
use crate::error::{ModelError, ModelResult};
use crate::model::{ChemistryModel, ConvergenceStatus, SolveMode};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    /// Baseline model value.
    pub value: f64,
    /// One coefficient per requested id, in request order.
    pub coefficients: Vec<f64>,
    pub statuses: Vec<ConvergenceStatus>,
}

impl SensitivityReport {
    /// Positions into `coefficients`, largest magnitude first.
    pub fn rank_by_magnitude(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.coefficients.len()).collect();
        order.sort_by(|&a, &b| {
            self.coefficients[b]
                .abs()
                .total_cmp(&self.coefficients[a].abs())
        });
        order
    }

    pub fn all_converged(&self) -> bool {
        self.statuses
            .iter()
            .all(|s| *s != ConvergenceStatus::NonConvergent)
    }
}

pub fn write_finite_difference_header(log: &mut dyn Write) -> ModelResult<()> {
    writeln!(
        log,
        "{:>5} {:>12}  {:>12}  {:>11}  {:<6} {}",
        "Rxn", "Value+", "Value-", "Sensitivity", "Status", "Parameter"
    )?;
    Ok(())
}

pub fn write_finite_difference_line(
    log: &mut dyn Write,
    id: usize,
    plus: f64,
    minus: f64,
    coefficient: f64,
    status: ConvergenceStatus,
    name: &str,
) -> ModelResult<()> {
    writeln!(
        log,
        "{:>5} {:>12.5e}  {:>12.5e}  {:>11.4e}  {:<6} {}",
        id,
        plus,
        minus,
        coefficient,
        status.tag(),
        name
    )?;
    Ok(())
}

pub fn write_adjoint_header(log: &mut dyn Write) -> ModelResult<()> {
    writeln!(log, "{:>5}  {:>11}  {}", "Rxn", "Sensitivity", "Parameter")?;
    Ok(())
}

pub fn write_adjoint_line(
    log: &mut dyn Write,
    id: usize,
    coefficient: f64,
    name: &str,
) -> ModelResult<()> {
    writeln!(log, "{id:>5}  {coefficient:>11.4e}  {name}")?;
    Ok(())
}

/// Print entries of a sensitivity vector indexed by parameter id.
///
/// `selection` defaults to every id in the vector.
pub fn print_sensitivities(
    catalog: &ParameterCatalog,
    coefficients: &[f64],
    selection: Option<&[usize]>,
    out: &mut dyn Write,
) -> ModelResult<()> {
    let all: Vec<usize>;
    let ids = match selection {
        Some(ids) => ids,
        None => {
            all = (0..coefficients.len()).collect();
            &all
        }
    };
    for &id in ids {
        let coefficient = *coefficients.get(id).ok_or(ModelError::InvalidParameterId {
            id,
            len: coefficients.len(),
        })?;
        write_adjoint_line(out, id, coefficient, &catalog.get(id)?.name)?;
    }
    Ok(())
}

fn check_perturbation(perturbation: f64) -> ModelResult<()> {
    if perturbation.is_finite() && perturbation > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidValue {
            what: "perturbation fraction",
            value: perturbation,
        })
    }
}

fn check_baseline(value: f64) -> ModelResult<()> {
    if value.is_finite() && value != 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidValue {
            what: "baseline model value",
            value,
        })
    }
}

/// Validate a sensitivity request against the model's catalog.
pub fn check_request<M: ChemistryModel + ?Sized>(
    model: &M,
    perturbation: f64,
    parameter_ids: &[usize],
) -> ModelResult<()> {
    check_perturbation(perturbation)?;
    for &id in parameter_ids {
        model.model_parameter_info(id)?;
    }
    Ok(())
}

struct Sample {
    plus: f64,
    minus: f64,
    status: ConvergenceStatus,
}

fn perturbed_pair<M: ChemistryModel + ?Sized>(
    model: &mut M,
    id: usize,
    base: f64,
    factor: f64,
) -> ModelResult<Sample> {
    model.perturb_parameter(id, base * factor)?;
    let plus = model.evaluate_in(SolveMode::Sensitivity)?;

    model.perturb_parameter(id, base / factor)?;
    model.load_restart()?;
    let minus = model.evaluate_in(SolveMode::Sensitivity)?;

    Ok(Sample {
        plus: plus.value,
        minus: minus.value,
        status: plus.status.worst(minus.status),
    })
}

/// Central-difference sensitivity of the model value to each parameter.
///
/// Each parameter is restored to its original value before moving on, also
/// when an evaluation fails.
pub fn finite_difference<M: ChemistryModel + ?Sized>(
    model: &mut M,
    perturbation: f64,
    parameter_ids: &[usize],
    log: &mut dyn Write,
) -> ModelResult<SensitivityReport> {
    check_request(model, perturbation, parameter_ids)?;

    let baseline = model.evaluate_in(SolveMode::Standard)?;
    check_baseline(baseline.value)?;
    tracing::info!(
        value = baseline.value,
        status = %baseline.status,
        parameters = parameter_ids.len(),
        "sensitivity baseline"
    );
    model.save_restart()?;

    write_finite_difference_header(log)?;
    let factor = 1.0 + perturbation;
    let mut coefficients = Vec::with_capacity(parameter_ids.len());
    let mut statuses = Vec::with_capacity(parameter_ids.len());

    for &id in parameter_ids {
        let base = model.get_parameter(id)?;
        let sample = perturbed_pair(model, id, base, factor);
        let restored = model.perturb_parameter(id, base);
        let sample = match (sample, restored) {
            (Ok(sample), Ok(())) => sample,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(restore)) => {
                tracing::warn!(id, error = %restore, "could not restore parameter after failed solve");
                return Err(e);
            }
        };

        let coefficient = (sample.plus - sample.minus) / (2.0 * perturbation * baseline.value);
        let name = model.model_parameter_info(id)?.name.clone();
        write_finite_difference_line(
            log,
            id,
            sample.plus,
            sample.minus,
            coefficient,
            sample.status,
            &name,
        )?;
        if sample.status == ConvergenceStatus::NonConvergent {
            tracing::warn!(id, parameter = %name, "perturbed solve did not converge");
        }
        coefficients.push(coefficient);
        statuses.push(sample.status);
    }

    Ok(SensitivityReport {
        value: baseline.value,
        coefficients,
        statuses,
    })
}
