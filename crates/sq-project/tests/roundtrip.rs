use sq_project::defaults::DEFAULT_BLOCK_COUNT;
use sq_project::schema::*;
use sq_project::{ProjectError, ValidationError, load, load_json, load_yaml, save_json, save_yaml};

fn sample_project() -> Project {
    let mut project = Project::new("Chain study");
    project
        .runs
        .push(RunDef::default_chain("default", "Default chain", DEFAULT_BLOCK_COUNT));

    let mut explicit = RunDef::default_chain("explicit", "Explicit phonons", 2);
    explicit.run_type = RunType::Phonon;
    explicit.coupling = false;
    explicit.finish = FinishDef {
        multiplier: 50.0,
        basis: FinishBasis::MaxTau,
    };
    explicit.reduce = ReduceDef {
        samples: Some(25),
        stride: None,
        representative_phonon_mode: Some(0),
    };
    for block in &mut explicit.blocks {
        block.electron = None;
        block.fermi_energy_ev = None;
        block.phonon = Some(BandDef {
            table: BandTableDef::Explicit {
                energies_j: vec![1e-21],
                dos_weights: vec![1.0],
                relaxation_times_s: Some(vec![1e-12]),
            },
            relaxation_time_s: None,
            effective_mass: None,
            group_velocity_m_s: Some(6000.0),
        });
    }
    explicit.blocks[0].temperature_k = 500.0;
    project.runs.push(explicit);
    project
}

#[test]
fn roundtrip_yaml() {
    let project = sample_project();
    let path = std::env::temp_dir().join("sq_project_roundtrip.yaml");
    save_yaml(&path, &project).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(project, loaded);
    assert_eq!(load(&path).unwrap(), project);
}

#[test]
fn roundtrip_json() {
    let project = sample_project();
    let path = std::env::temp_dir().join("sq_project_roundtrip.json");
    save_json(&path, &project).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(project, loaded);
    assert_eq!(load(&path).unwrap(), project);
}

#[test]
fn minimal_yaml_fills_defaults() {
    let yaml = r#"
version: 1
name: Minimal
runs:
  - id: pair
    name: Phonon pair
    run_type: Phonon
    blocks:
      - size_m: 1.0e-7
        temperature_k: 500.0
        phonon:
          table: { type: Explicit, energies_j: [1.0e-21], dos_weights: [1.0] }
          relaxation_time_s: 1.0e-12
          group_velocity_m_s: 6000.0
      - size_m: 1.0e-7
        temperature_k: 300.0
        phonon:
          table: { type: Uniform, e_min_j: 1.0e-21, e_max_j: 1.0e-21, count: 1, dos_weight: 1.0 }
          relaxation_time_s: 1.0e-12
          group_velocity_m_s: 6000.0
"#;
    let path = std::env::temp_dir().join("sq_project_minimal.yaml");
    std::fs::write(&path, yaml).unwrap();
    let project = load_yaml(&path).unwrap();
    let run = &project.runs[0];
    assert!(run.coupling);
    assert_eq!(run.finish, FinishDef::default());
    assert_eq!(run.tolerances, TolerancesDef::default());
    assert_eq!(run.integrator, IntegratorDef::DormandPrince45);
    assert_eq!(run.record_every, 1);
    assert_eq!(run.blocks[1].phonon.as_ref().unwrap().table.energies_j(), vec![1e-21]);
}

#[test]
fn invalid_file_reports_field_path() {
    let mut project = sample_project();
    project.runs[0].blocks[3].temperature_k = -1.0;
    let path = std::env::temp_dir().join("sq_project_invalid.yaml");
    std::fs::write(&path, serde_yaml::to_string(&project).unwrap()).unwrap();
    match load_yaml(&path) {
        Err(ProjectError::Validation(err @ ValidationError::InvalidValue { .. })) => {
            assert_eq!(err.field(), Some("runs[0].blocks[3].temperature_k"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(save_yaml(&path, &project).is_err());
}

#[test]
fn future_versions_are_rejected() {
    let mut project = sample_project();
    project.version = 99;
    let path = std::env::temp_dir().join("sq_project_future.json");
    std::fs::write(&path, serde_json::to_string(&project).unwrap()).unwrap();
    assert!(matches!(
        load_json(&path),
        Err(ProjectError::Validation(ValidationError::UnsupportedVersion { version: 99 }))
    ));
}
