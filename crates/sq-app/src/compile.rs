//! Run definition to registry, initial state and integrator settings.

use nalgebra::DVector;
use sq_core::{Tolerances, ev, k, m, mps, s};
use sq_modes::{BandInput, BlockInput, CarrierModel, ModeRegistry, RegistryBuilder, SpeciesSet};
use sq_project::schema::{BandDef, FinishBasis, IntegratorDef, RunDef, RunType};
use sq_reduce::{Downsample, ReduceOptions};
use sq_sim::{IntegratorType, SimOptions};
use sq_solver::{BlockState, SeaContext, initial_state};
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// Everything needed to integrate and reduce one run.
#[derive(Debug, Clone)]
pub struct CompiledRun {
    pub registry: Arc<ModeRegistry>,
    pub initial: DVector<f64>,
    pub coupling: bool,
    pub sim_options: SimOptions,
    pub reduce_options: ReduceOptions,
}

impl CompiledRun {
    pub fn context(&self) -> SeaContext {
        SeaContext::new(Arc::clone(&self.registry), self.coupling)
    }
}

pub fn compile_run(run: &RunDef) -> AppResult<CompiledRun> {
    sq_project::validate_run(run, &format!("run '{}'", run.id))?;

    let species = species_set(run.run_type);
    let mut builder = RegistryBuilder::new(species);
    let mut states = Vec::with_capacity(run.blocks.len());
    for (b, block) in run.blocks.iter().enumerate() {
        let mut input = BlockInput::new(m(block.size_m));
        if run.run_type.has_electrons() {
            let band = required(&block.electron, b, "electron")?;
            let mass = band.effective_mass.ok_or_else(|| {
                AppError::Compile(format!("block {b}: electron band has no effective mass"))
            })?;
            input = input.with_electron(band_input(band, CarrierModel::EffectiveMass(mass)));
        }
        if run.run_type.has_phonons() {
            let band = required(&block.phonon, b, "phonon")?;
            let v = band.group_velocity_m_s.ok_or_else(|| {
                AppError::Compile(format!("block {b}: phonon band has no group velocity"))
            })?;
            input = input.with_phonon(band_input(band, CarrierModel::GroupVelocity(mps(v))));
        }
        builder.push_block(input);
        states.push(BlockState::new(
            k(block.temperature_k),
            ev(block.fermi_energy_ev.unwrap_or(0.0)),
        ));
    }

    let registry = Arc::new(builder.build()?);
    let initial = initial_state(&registry, &states)?;

    let tau = match run.finish.basis {
        FinishBasis::MinTau => registry.min_relaxation_time(),
        FinishBasis::MaxTau => registry.max_relaxation_time(),
    }
    .ok_or_else(|| AppError::Compile("run has no modes".to_string()))?;

    let defaults = SimOptions::default();
    let sim_options = SimOptions {
        t_end: run.finish.multiplier * tau,
        dt: run.initial_dt_s,
        tolerances: Tolerances {
            abs: run.tolerances.abs,
            rel: run.tolerances.rel,
        },
        max_steps: run.max_steps,
        record_every: run.record_every,
        integrator: match run.integrator {
            IntegratorDef::DormandPrince45 => IntegratorType::DormandPrince45,
            IntegratorDef::RK4 => IntegratorType::RK4,
        },
        min_dt: run.min_dt_s.unwrap_or(defaults.min_dt),
        ..defaults
    };

    let downsample = match (run.reduce.samples, run.reduce.stride) {
        (Some(n), _) => Downsample::Count(n),
        (None, Some(n)) => Downsample::Stride(n),
        (None, None) => Downsample::All,
    };
    let reduce_options = ReduceOptions {
        downsample,
        representative_phonon_mode: run.reduce.representative_phonon_mode,
    };

    Ok(CompiledRun {
        registry,
        initial,
        coupling: run.coupling && species == SpeciesSet::Both,
        sim_options,
        reduce_options,
    })
}

fn species_set(run_type: RunType) -> SpeciesSet {
    match run_type {
        RunType::Electron => SpeciesSet::Electron,
        RunType::Phonon => SpeciesSet::Phonon,
        RunType::Both => SpeciesSet::Both,
    }
}

fn required<'a>(band: &'a Option<BandDef>, block: usize, what: &str) -> AppResult<&'a BandDef> {
    band.as_ref()
        .ok_or_else(|| AppError::Compile(format!("block {block}: missing {what} band")))
}

fn band_input(band: &BandDef, carrier: CarrierModel) -> BandInput {
    BandInput {
        energies_j: band.table.energies_j(),
        dos_weights: band.table.dos_weights(),
        relaxation_times_s: band.table.relaxation_times_s().map(<[f64]>::to_vec),
        relaxation_constant: band.relaxation_time_s.map(s),
        carrier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sq_modes::Species;
    use sq_project::schema::{BandTableDef, FinishDef, ReduceDef};

    #[test]
    fn default_chain_compiles() {
        let run = RunDef::default_chain("d", "Default", 4);
        let compiled = compile_run(&run).unwrap();
        let registry = &compiled.registry;
        assert_eq!(registry.block_count(), 4);
        assert_eq!(registry.len(), 4 * (21 + 16));
        assert_eq!(compiled.initial.len(), registry.len());
        assert!(compiled.coupling);
        let min_tau = registry.min_relaxation_time().unwrap();
        assert_eq!(compiled.sim_options.t_end, 100.0 * min_tau);
        assert_eq!(compiled.reduce_options.downsample, Downsample::All);
    }

    #[test]
    fn phonon_run_drops_electrons_and_coupling() {
        let mut run = RunDef::default_chain("p", "Phonons", 2);
        run.run_type = RunType::Phonon;
        run.finish = FinishDef {
            multiplier: 10.0,
            basis: FinishBasis::MaxTau,
        };
        run.reduce = ReduceDef {
            samples: Some(5),
            ..ReduceDef::default()
        };
        for block in &mut run.blocks {
            block.phonon = Some(BandDef {
                table: BandTableDef::Explicit {
                    energies_j: vec![1e-21, 2e-21],
                    dos_weights: vec![1.0, 1.0],
                    relaxation_times_s: Some(vec![1e-12, 3e-12]),
                },
                relaxation_time_s: None,
                effective_mass: None,
                group_velocity_m_s: Some(6000.0),
            });
        }
        let compiled = compile_run(&run).unwrap();
        assert!(!compiled.coupling);
        assert!(!compiled.registry.has_species(Species::Electron));
        assert_eq!(compiled.registry.len(), 4);
        assert_eq!(compiled.sim_options.t_end, 10.0 * 3e-12);
        assert_eq!(compiled.reduce_options.downsample, Downsample::Count(5));
    }

    #[test]
    fn invalid_definition_is_rejected_before_building() {
        let mut run = RunDef::default_chain("bad", "Bad", 2);
        run.blocks[1].size_m = 0.0;
        assert!(matches!(compile_run(&run), Err(AppError::Validation(_))));
    }
}
