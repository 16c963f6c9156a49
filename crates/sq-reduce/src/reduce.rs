//! Trajectory reduction.

use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sq_core::units::constants::{BOLTZMANN, joule_to_ev};
use sq_modes::{Mode, ModeRegistry, Species};
use sq_solver::{SolverError, project_block};
use tracing::{debug, info};

use crate::downsample::Downsample;
use crate::error::{ReduceError, ReduceResult};
use crate::observable::{BlockObservables, ObservableSeries, SampleObservables};
use crate::transport::{
    electron_coefficients, electron_kernels, figure_of_merit, phonon_conductivity,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceOptions {
    pub downsample: Downsample,
    /// Local phonon mode whose activity defines the lattice temperature.
    /// `None` picks the highest-energy mode of each block.
    pub representative_phonon_mode: Option<usize>,
}

/// Reduce a recorded trajectory. `times[i]` is the time of `states[i]`.
///
/// Samples are reduced in parallel; on failure the error of the earliest
/// failing sample is returned.
pub fn reduce(
    registry: &ModeRegistry,
    times: &[f64],
    states: &[DVector<f64>],
    options: &ReduceOptions,
) -> ReduceResult<ObservableSeries> {
    if times.len() != states.len() {
        return Err(ReduceError::InvalidOption {
            what: format!(
                "{} sample times for {} states",
                times.len(),
                states.len()
            ),
        });
    }
    let indices = options.downsample.indices(states.len())?;
    info!(
        samples = indices.len(),
        recorded = states.len(),
        blocks = registry.block_count(),
        "Reducing trajectory"
    );

    let reduced: Vec<ReduceResult<SampleObservables>> = indices
        .par_iter()
        .map(|&i| reduce_sample(registry, times[i], &states[i], options))
        .collect();
    let samples = reduced.into_iter().collect::<ReduceResult<Vec<_>>>()?;
    Ok(ObservableSeries { samples })
}

/// Observables of every block at one sample.
pub fn reduce_sample(
    registry: &ModeRegistry,
    time: f64,
    y: &DVector<f64>,
    options: &ReduceOptions,
) -> ReduceResult<SampleObservables> {
    if y.len() != registry.len() {
        return Err(SolverError::StateDimension {
            expected: registry.len(),
            got: y.len(),
        }
        .into());
    }
    let y = y.as_slice();
    let blocks = (0..registry.block_count())
        .map(|b| reduce_block(registry, b, time, y, options))
        .collect::<ReduceResult<Vec<_>>>()?;

    let total_entropy_j_per_k = blocks.iter().map(|b| b.entropy_j_per_k).sum();
    let temperature_gradient_k = temperature_gradient(&blocks);
    debug!(time, total_entropy_j_per_k, "Reduced sample");
    Ok(SampleObservables {
        time_s: time,
        blocks,
        total_entropy_j_per_k,
        temperature_gradient_k,
    })
}

fn reduce_block(
    registry: &ModeRegistry,
    block: usize,
    time: f64,
    y: &[f64],
    options: &ReduceOptions,
) -> ReduceResult<BlockObservables> {
    let info = registry.block_info(block)?;
    let mut out = BlockObservables::default();
    let mut kappa_parts: Vec<f64> = Vec::new();

    if registry.has_species(Species::Electron) {
        let range = registry.block_range(Species::Electron, block)?;
        let modes = registry.block_modes(Species::Electron, block)?;
        let ys = &y[range];
        let (number, energy, entropy) = populations(Species::Electron, modes, ys);
        out.electron_number = Some(number);
        out.electron_energy_j = Some(energy);
        out.entropy_j_per_k += entropy;

        let projection = local_projection(registry, Species::Electron, block, y, time)?;
        let t_e = projection.as_ref().and_then(|p| p.temperature_k());
        let mu_j = projection.as_ref().and_then(|p| p.chemical_potential_j());
        out.electron_temperature_k = t_e;
        out.electron_chemical_potential_ev = mu_j.map(joule_to_ev);

        if let (Some(t), Some(mu), Some(mass)) = (t_e, mu_j, info.effective_mass) {
            let k = electron_kernels(modes, ys, mu, mass);
            let (sigma, seebeck, kappa_e) = electron_coefficients(k, t);
            out.electrical_conductivity = sigma;
            out.seebeck_v_per_k = seebeck;
            out.electronic_thermal_conductivity = kappa_e;
            kappa_parts.extend(kappa_e);
        }
    }

    if registry.has_species(Species::Phonon) {
        let range = registry.block_range(Species::Phonon, block)?;
        let modes = registry.block_modes(Species::Phonon, block)?;
        let ys = &y[range];
        if let Some(bad) = ys.iter().position(|&v| !Species::Phonon.activity_in_domain(v)) {
            return Err(SolverError::NonPhysicalActivity {
                species: Species::Phonon,
                block,
                mode: bad,
                value: ys[bad],
            }
            .into());
        }
        let (number, energy, entropy) = populations(Species::Phonon, modes, ys);
        out.phonon_number = Some(number);
        out.phonon_energy_j = Some(energy);
        out.entropy_j_per_k += entropy;
        out.phonon_temperature_k =
            representative_temperature(modes, ys, options.representative_phonon_mode)?;

        if let Some(v) = info.group_velocity_m_s {
            out.phonon_thermal_conductivity = phonon_conductivity(modes, ys, v);
            kappa_parts.extend(out.phonon_thermal_conductivity);
        }
    }

    if !kappa_parts.is_empty() {
        out.thermal_conductivity = Some(kappa_parts.iter().sum());
    }
    if let (Some(sigma), Some(seebeck), Some(t), Some(kappa)) = (
        out.electrical_conductivity,
        out.seebeck_v_per_k,
        out.electron_temperature_k,
        out.thermal_conductivity,
    ) {
        out.zt = figure_of_merit(sigma, seebeck, t, kappa);
    }
    Ok(out)
}

/// `(sum dos p, sum dos p E, k_B sum dos s(p))` over one block of one species.
fn populations(species: Species, modes: &[Mode], ys: &[f64]) -> (f64, f64, f64) {
    let mut number = 0.0;
    let mut energy = 0.0;
    let mut entropy = 0.0;
    for (mode, &yi) in modes.iter().zip(ys) {
        let p = species.occupation(yi);
        number += mode.dos_weight * p;
        energy += mode.dos_weight * p * mode.energy_j;
        entropy += mode.dos_weight * species.mode_entropy(p);
    }
    (number, energy, BOLTZMANN * entropy)
}

/// Local projection; a degenerate fit leaves the derived quantities undefined
/// rather than failing the sample.
fn local_projection(
    registry: &ModeRegistry,
    species: Species,
    block: usize,
    y: &[f64],
    time: f64,
) -> ReduceResult<Option<sq_solver::Projection>> {
    match project_block(registry, species, block, y, time) {
        Ok(p) => Ok(Some(p)),
        Err(SolverError::ProjectionDegeneracy { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn representative_temperature(
    modes: &[Mode],
    ys: &[f64],
    requested: Option<usize>,
) -> ReduceResult<Option<f64>> {
    let index = match requested {
        Some(i) if i < modes.len() => i,
        Some(i) => {
            return Err(ReduceError::InvalidOption {
                what: format!(
                    "representative phonon mode {i} out of range ({} modes per block)",
                    modes.len()
                ),
            });
        }
        None => match highest_energy(modes) {
            Some(i) => i,
            None => return Ok(None),
        },
    };
    let t = modes[index].energy_j / (BOLTZMANN * ys[index]);
    Ok((t.is_finite() && t > 0.0).then_some(t))
}

fn highest_energy(modes: &[Mode]) -> Option<usize> {
    modes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.energy_j.total_cmp(&b.1.energy_j))
        .map(|(i, _)| i)
}

fn temperature_gradient(blocks: &[BlockObservables]) -> Option<f64> {
    let (first, last) = (blocks.first()?, blocks.last()?);
    let pick = |b: &BlockObservables| b.phonon_temperature_k.or(b.electron_temperature_k);
    Some((pick(first)? - pick(last)?).abs())
}
