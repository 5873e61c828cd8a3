//! Flame speed evaluations on the methane fixture with the surrogate solver.

use ks_flame::{FlameError, FlameSpeedConfig, SensitivityMethod, SolvePath, SurrogateFlameSpeed};
use ks_kinetics::{Composition, KineticsError};
use ks_model::{ChemistryModel, ConvergenceStatus, ModelError, ParameterKind};
use std::path::PathBuf;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../ks-kinetics/tests/data/methane_lite.yaml")
}

/// Stoichiometric methane-air at 300 K and 1 atm, with a per-test restart file.
fn config(tag: &str) -> FlameSpeedConfig {
    let comp = Composition::parse("CH4:1, O2:2, N2:7.52").unwrap();
    let mut cfg = FlameSpeedConfig::new(300.0, 1.0, comp, fixture());
    cfg.name = std::env::temp_dir()
        .join(format!("ks_flame_{tag}"))
        .to_string_lossy()
        .into_owned();
    cfg.loglevel = 1;
    let _ = std::fs::remove_file(cfg.restart_path());
    cfg
}

#[test]
fn stoichiometric_methane_flame_speed() {
    init_logging();
    let mut model = SurrogateFlameSpeed::surrogate(&config("baseline")).unwrap();
    assert!(model.core().chemistry().is_blank());

    let eval = model.evaluate().unwrap();

    assert!(eval.value > 10.0 && eval.value < 100.0, "{} cm/s", eval.value);
    assert_eq!(eval.path, SolvePath::ColdStart.as_str());
    assert_eq!(eval.stages.len(), 3);
    assert_eq!(eval.status, ConvergenceStatus::ConvergedWithRetry);
    assert!(eval.stages.iter().all(|s| s.converged));
    assert!(model.solver().unwrap().grid().len() > 10);
}

#[test]
fn unknown_species_fails_at_construction() {
    let mut cfg = config("unknown_species");
    cfg.composition = Composition::parse("XYZ:1, O2:2").unwrap();
    let err = SurrogateFlameSpeed::surrogate(&cfg).err().unwrap();
    assert!(matches!(
        err,
        FlameError::Model(ModelError::Kinetics(KineticsError::UnknownSpecies { ref name })) if name == "XYZ"
    ));
}

#[test]
fn display_names_the_conditions() {
    let model = SurrogateFlameSpeed::surrogate(&config("display")).unwrap();
    let text = model.to_string();
    assert!(text.starts_with("Laminar flame speed:      300 K, 101.3"), "{text}");
    assert!(text.contains("CH4:"));
}

#[test]
fn adjoint_sensitivity_log_layout() {
    init_logging();
    let mut model = SurrogateFlameSpeed::surrogate(&config("adjoint_log")).unwrap();
    let mut log = Vec::new();

    let report = model.sensitivity(0.01, &[0, 1, 2], &mut log).unwrap();

    assert_eq!(report.coefficients.len(), 3);
    let text = String::from_utf8(log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    for (line, id) in lines[1..].iter().zip([0usize, 1, 2]) {
        let first: usize = line.split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(first, id);
    }
}

#[test]
fn adjoint_and_finite_difference_agree() {
    init_logging();
    let ids = [1, 2, 5];
    let expected = 0.5 / 12.0;

    let mut adjoint = SurrogateFlameSpeed::surrogate(&config("agree_adjoint")).unwrap();
    let a = adjoint.sensitivity(0.02, &ids, &mut std::io::sink()).unwrap();

    let mut fd = SurrogateFlameSpeed::surrogate(&config("agree_fd"))
        .unwrap()
        .with_sensitivity_method(SensitivityMethod::FiniteDifference);
    let mut log = Vec::new();
    let f = fd.sensitivity(0.02, &ids, &mut log).unwrap();

    for (sa, sf) in a.coefficients.iter().zip(&f.coefficients) {
        assert!((sa / expected - 1.0).abs() < 1e-3, "adjoint {sa}");
        assert!((sf / expected - 1.0).abs() < 0.05, "finite difference {sf}");
    }
    assert!(f.all_converged());
    assert_eq!(String::from_utf8(log).unwrap().lines().count(), 1 + ids.len());
    assert!(fd.has_restart());
    assert!(fd.savefile().exists());
}

#[test]
fn sensitivity_restores_parameters() {
    let mut model = SurrogateFlameSpeed::surrogate(&config("restore"))
        .unwrap()
        .with_sensitivity_method(SensitivityMethod::FiniteDifference);
    model.initialize_chemistry().unwrap();
    let before = model.get_parameter(5).unwrap();

    model.sensitivity(0.05, &[5], &mut std::io::sink()).unwrap();

    assert_eq!(model.get_parameter(5).unwrap(), before);
}

#[test]
fn adjoint_rejects_activation_energies() {
    let mut cfg = config("energy");
    cfg.no_energy = false;
    let mut model = SurrogateFlameSpeed::surrogate(&cfg).unwrap();
    let energy_id = (0..model.number_parameters())
        .find(|id| model.model_parameter_info(*id).unwrap().kind == ParameterKind::Energy)
        .unwrap();

    let err = model
        .sensitivity(0.01, &[0, energy_id], &mut std::io::sink())
        .unwrap_err();

    assert!(matches!(err, ModelError::UnsupportedAdjointParameter { id, .. } if id == energy_id));
    assert!(model.core().chemistry().is_blank());
}

#[test]
fn restart_then_ignore_restart() {
    init_logging();
    let mut model = SurrogateFlameSpeed::surrogate(&config("restart")).unwrap();
    let cold = model.evaluate().unwrap();
    model.save_restart().unwrap();

    let warm = model.evaluate().unwrap();
    assert_eq!(warm.path, SolvePath::Restart.as_str());
    assert_eq!(warm.stages.len(), 1);
    assert_eq!(warm.status, ConvergenceStatus::Converged);
    assert!((warm.value / cold.value - 1.0).abs() < 1e-3);

    model.ignore_restart();
    let again = model.evaluate().unwrap();
    assert_eq!(again.path, SolvePath::ColdStart.as_str());
    assert_eq!(again.stages.len(), 3);
    assert_eq!(model.last_solve().unwrap().path, "cold-start");
}

#[test]
fn prepare_for_save_writes_restart_and_blanks() {
    let mut model = SurrogateFlameSpeed::surrogate(&config("persist")).unwrap();

    // Nothing to save yet: the failure is logged, not returned.
    model.prepare_for_save().unwrap();
    assert!(!model.savefile().exists());

    model.evaluate().unwrap();
    assert!(serde_json::to_string(&model).is_err());
    model.prepare_for_save().unwrap();

    assert!(model.core().chemistry().is_blank());
    assert!(model.savefile().exists());
    assert!(model.has_restart());
    let json = serde_json::to_string(&model).unwrap();
    assert!(json.contains("\"restart\":true"));

    // A fresh chemistry picks up the saved solution through the restart path.
    let eval = model.evaluate().unwrap();
    assert_eq!(eval.path, "restart");
    assert!(eval.value > 10.0);
}

#[test]
fn model_parameters_follow_the_falloff_policy() {
    let mut model = SurrogateFlameSpeed::surrogate(&config("coupling")).unwrap();
    model.initialize_chemistry().unwrap();
    let desc = model.model_parameter_info(5).unwrap().clone();
    assert_eq!(desc.kind, ParameterKind::HighPressureA);

    let low = |m: &SurrogateFlameSpeed| {
        use ks_kinetics::Kinetics;
        let gas = m.core().chemistry().gas().unwrap();
        gas.reaction(desc.reaction).unwrap().low_rate().unwrap().pre_exponential_factor
    };
    let low_before = low(&model);
    let high = model.get_parameter(5).unwrap();
    model.perturb_parameter(5, high * 2.0).unwrap();
    assert!((low(&model) / low_before - 2.0).abs() < 1e-12);

    model.reset_model().unwrap();
    assert_eq!(model.get_parameter(5).unwrap(), high);
    assert_eq!(low(&model), low_before);
}

#[test]
fn config_file_round_trip() {
    let path = std::env::temp_dir().join("ks_flame_config.yaml");
    std::fs::write(
        &path,
        format!(
            "temperature_k: 300\npressure_atm: 1\ncomposition: \"CH4:1, O2:2, N2:7.52\"\nmechanism: {}\ninitial_points: 12\n",
            fixture().display()
        ),
    )
    .unwrap();
    let cfg = FlameSpeedConfig::from_path(&path).unwrap();
    let model = SurrogateFlameSpeed::surrogate(&cfg).unwrap();
    assert_eq!(model.initial_grid().len(), 12);
    assert_eq!(model.number_parameters(), 12);
    let _ = std::fs::remove_file(&path);
}
