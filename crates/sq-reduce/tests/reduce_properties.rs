//! Reducer properties on hand-built states.

use nalgebra::DVector;
use sq_core::units::constants::{BOLTZMANN, ev_to_joule};
use sq_core::{ev, k, m, mps};
use sq_modes::{BandInput, BlockInput, CarrierModel, ModeRegistry, RegistryBuilder, SpeciesSet};
use sq_reduce::{Downsample, Observable, ReduceError, ReduceOptions, reduce, reduce_sample};
use sq_solver::{BlockState, SolverError, initial_state};

const NE: usize = 7;
const NP: usize = 4;

fn electron_band() -> BandInput {
    let energies = (0..NE)
        .map(|i| ev_to_joule(0.8 + 0.4 * i as f64 / (NE - 1) as f64))
        .collect();
    let dos = (0..NE).map(|i| 1.0 + 0.5 * i as f64).collect();
    let taus = (0..NE).map(|i| 1e-14 * (1.0 + 0.2 * i as f64)).collect();
    BandInput::explicit(energies, dos, taus, CarrierModel::EffectiveMass(1.0))
}

fn phonon_band() -> BandInput {
    let energies = (0..NP).map(|i| 1e-21 * (i + 1) as f64).collect();
    let dos = vec![1.0; NP];
    let taus = vec![1e-12; NP];
    BandInput::explicit(energies, dos, taus, CarrierModel::GroupVelocity(mps(6000.0)))
}

fn registry(species: SpeciesSet, blocks: usize) -> ModeRegistry {
    let mut builder = RegistryBuilder::new(species);
    for _ in 0..blocks {
        builder.push_block(
            BlockInput::new(m(1e-7))
                .with_electron(electron_band())
                .with_phonon(phonon_band()),
        );
    }
    builder.build().unwrap()
}

fn thermal(registry: &ModeRegistry, temps: &[f64]) -> DVector<f64> {
    let blocks: Vec<_> = temps
        .iter()
        .map(|&t| BlockState::new(k(t), ev(1.0)))
        .collect();
    initial_state(registry, &blocks).unwrap()
}

fn rel_close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * b.abs().max(a.abs())
}

#[test]
fn thermal_blocks_report_their_temperature_and_fermi_level() {
    let registry = registry(SpeciesSet::Both, 3);
    let y = thermal(&registry, &[450.0, 400.0, 350.0]);
    let sample = reduce_sample(&registry, 0.0, &y, &ReduceOptions::default()).unwrap();

    for (b, expected) in [450.0, 400.0, 350.0].into_iter().enumerate() {
        let block = &sample.blocks[b];
        let t_e = block.electron_temperature_k.unwrap();
        let t_p = block.phonon_temperature_k.unwrap();
        let mu = block.electron_chemical_potential_ev.unwrap();
        assert!(rel_close(t_e, expected, 1e-8), "block {b}: T_e {t_e}");
        assert!(rel_close(t_p, expected, 1e-10), "block {b}: T_p {t_p}");
        assert!((mu - 1.0).abs() < 1e-8, "block {b}: mu {mu}");
        assert!(block.electrical_conductivity.unwrap() > 0.0);
        assert!(block.phonon_thermal_conductivity.unwrap() > 0.0);
    }
    assert!(rel_close(sample.temperature_gradient_k.unwrap(), 100.0, 1e-9));
}

#[test]
fn entropy_matches_manual_sum() {
    let registry = registry(SpeciesSet::Both, 2);
    let y = thermal(&registry, &[500.0, 300.0]);
    let sample = reduce_sample(&registry, 1e-12, &y, &ReduceOptions::default()).unwrap();

    let manual: f64 = registry
        .modes()
        .iter()
        .enumerate()
        .map(|(i, mode)| {
            let p = mode.species.occupation(y[i]);
            BOLTZMANN * mode.dos_weight * mode.species.mode_entropy(p)
        })
        .sum();
    assert!(rel_close(sample.total_entropy_j_per_k, manual, 1e-12));
    let per_block: f64 = sample.blocks.iter().map(|b| b.entropy_j_per_k).sum();
    assert_eq!(per_block, sample.total_entropy_j_per_k);
    assert_eq!(sample.time_s, 1e-12);
}

#[test]
fn zt_uses_coefficients_of_the_same_sample() {
    let registry = registry(SpeciesSet::Both, 2);
    let states = vec![
        thermal(&registry, &[500.0, 300.0]),
        thermal(&registry, &[420.0, 380.0]),
    ];
    let series = reduce(&registry, &[0.0, 1.0], &states, &ReduceOptions::default()).unwrap();
    for sample in &series.samples {
        for block in &sample.blocks {
            let sigma = block.electrical_conductivity.unwrap();
            let seebeck = block.seebeck_v_per_k.unwrap();
            let t = block.electron_temperature_k.unwrap();
            let kappa = block.thermal_conductivity.unwrap();
            let expected = sigma * seebeck * seebeck * t / kappa;
            assert!(rel_close(block.zt.unwrap(), expected, 1e-12));
            let parts = block.electronic_thermal_conductivity.unwrap()
                + block.phonon_thermal_conductivity.unwrap();
            assert!(rel_close(kappa, parts, 1e-12));
        }
    }
    // different temperatures give different coefficients across samples
    let s0 = series.series(Observable::Seebeck, Some(0)).unwrap();
    assert_ne!(s0[0].1, s0[1].1);
}

#[test]
fn reduction_is_bit_identical_on_repeat() {
    let registry = registry(SpeciesSet::Both, 4);
    let times: Vec<f64> = (0..12).map(|i| i as f64 * 1e-13).collect();
    let states: Vec<_> = (0..12)
        .map(|i| {
            let spread = 200.0 * (1.0 - i as f64 / 12.0);
            thermal(
                &registry,
                &[400.0 + spread, 400.0, 400.0, 400.0 - 0.5 * spread],
            )
        })
        .collect();
    let options = ReduceOptions {
        downsample: Downsample::Stride(5),
        representative_phonon_mode: Some(0),
    };
    let first = reduce(&registry, &times, &states, &options).unwrap();
    let second = reduce(&registry, &times, &states, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.times(), vec![times[0], times[5], times[10], times[11]]);
}

#[test]
fn too_many_requested_samples_is_insufficient() {
    let registry = registry(SpeciesSet::Phonon, 2);
    let states = vec![thermal(&registry, &[300.0, 300.0]); 3];
    let options = ReduceOptions {
        downsample: Downsample::Count(5),
        ..ReduceOptions::default()
    };
    assert_eq!(
        reduce(&registry, &[0.0, 1.0, 2.0], &states, &options),
        Err(ReduceError::InsufficientSamples {
            available: 3,
            requested: 5
        })
    );
    assert!(matches!(
        reduce(&registry, &[0.0], &states, &ReduceOptions::default()),
        Err(ReduceError::InvalidOption { .. })
    ));
}

#[test]
fn phonon_only_run_has_no_electron_quantities() {
    let registry = registry(SpeciesSet::Phonon, 2);
    let y = thermal(&registry, &[310.0, 290.0]);
    let sample = reduce_sample(&registry, 0.0, &y, &ReduceOptions::default()).unwrap();
    let block = &sample.blocks[0];
    assert_eq!(block.electron_temperature_k, None);
    assert_eq!(block.electrical_conductivity, None);
    assert_eq!(block.zt, None);
    assert_eq!(
        block.thermal_conductivity,
        block.phonon_thermal_conductivity
    );
    assert!(rel_close(sample.temperature_gradient_k.unwrap(), 20.0, 1e-9));
}

#[test]
fn non_physical_phonon_state_is_rejected() {
    let registry = registry(SpeciesSet::Both, 2);
    let mut y = thermal(&registry, &[300.0, 300.0]);
    let index = registry.layout(sq_modes::Species::Phonon).span().start + NP + 1;
    y[index] = -0.5;
    let err = reduce_sample(&registry, 0.0, &y, &ReduceOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ReduceError::Solver(SolverError::NonPhysicalActivity {
            block: 1,
            mode: 1,
            ..
        })
    ));
}

#[test]
fn wrong_state_length_is_rejected() {
    let registry = registry(SpeciesSet::Electron, 2);
    let y = DVector::from_element(3, 0.0);
    assert_eq!(
        reduce_sample(&registry, 0.0, &y, &ReduceOptions::default()),
        Err(ReduceError::Solver(SolverError::StateDimension {
            expected: 2 * NE,
            got: 3
        }))
    );
}
