//! Project validation logic.
//!
//! Every error names the offending field by path, e.g.
//! `runs[0].blocks[3].phonon.table.dos_weights`.

use crate::schema::{BandDef, BandTableDef, BlockDef, IntegratorDef, Project, RunDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing field: {field} ({reason})")]
    Missing { field: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

impl ValidationError {
    /// Path of the offending field, when the error names one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } | ValidationError::Missing { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let mut run_ids = HashSet::new();
    for (i, run) in project.runs.iter().enumerate() {
        if !run_ids.insert(&run.id) {
            return Err(ValidationError::DuplicateId {
                id: run.id.clone(),
                context: "runs".to_string(),
            });
        }
        validate_run(run, &format!("runs[{i}]"))?;
    }
    Ok(())
}

pub fn validate_run(run: &RunDef, path: &str) -> Result<(), ValidationError> {
    if run.id.trim().is_empty() {
        return Err(invalid(format!("{path}.id"), &run.id, "must not be empty"));
    }
    if run.blocks.is_empty() {
        return Err(ValidationError::Missing {
            field: format!("{path}.blocks"),
            reason: "a run needs at least one block".to_string(),
        });
    }

    positive(&format!("{path}.finish.multiplier"), run.finish.multiplier)?;
    positive(&format!("{path}.tolerances.abs"), run.tolerances.abs)?;
    positive(&format!("{path}.tolerances.rel"), run.tolerances.rel)?;
    if run.max_steps == 0 {
        return Err(invalid(format!("{path}.max_steps"), 0, "must be at least 1"));
    }
    if run.record_every == 0 {
        return Err(invalid(format!("{path}.record_every"), 0, "must be at least 1"));
    }
    if let Some(dt) = run.initial_dt_s {
        positive(&format!("{path}.initial_dt_s"), dt)?;
    }
    if let Some(dt) = run.min_dt_s {
        positive(&format!("{path}.min_dt_s"), dt)?;
    }
    if run.integrator == IntegratorDef::RK4 && run.initial_dt_s.is_none() {
        return Err(ValidationError::Missing {
            field: format!("{path}.initial_dt_s"),
            reason: "the fixed-step integrator needs a step size".to_string(),
        });
    }

    match (run.reduce.samples, run.reduce.stride) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                format!("{path}.reduce"),
                "samples+stride",
                "set at most one of samples and stride",
            ));
        }
        (Some(0), None) => return Err(invalid(format!("{path}.reduce.samples"), 0, "must be at least 1")),
        (None, Some(0)) => return Err(invalid(format!("{path}.reduce.stride"), 0, "must be at least 1")),
        _ => {}
    }

    for (b, block) in run.blocks.iter().enumerate() {
        let block_path = format!("{path}.blocks[{b}]");
        validate_block(run, block, &block_path)?;
        if let (Some(mode), Some(phonon)) = (run.reduce.representative_phonon_mode, &block.phonon) {
            if run.run_type.has_phonons() && mode >= phonon.table.len() {
                return Err(invalid(
                    format!("{path}.reduce.representative_phonon_mode"),
                    mode,
                    &format!("{block_path} has {} phonon modes", phonon.table.len()),
                ));
            }
        }
    }
    Ok(())
}

fn validate_block(run: &RunDef, block: &BlockDef, path: &str) -> Result<(), ValidationError> {
    positive(&format!("{path}.size_m"), block.size_m)?;
    positive(&format!("{path}.temperature_k"), block.temperature_k)?;

    if run.run_type.has_electrons() {
        match block.fermi_energy_ev {
            None => {
                return Err(ValidationError::Missing {
                    field: format!("{path}.fermi_energy_ev"),
                    reason: "required when the run includes electrons".to_string(),
                });
            }
            Some(mu) if !mu.is_finite() => {
                return Err(invalid(format!("{path}.fermi_energy_ev"), mu, "must be finite"));
            }
            Some(_) => {}
        }
        let band = required_band(&block.electron, &format!("{path}.electron"))?;
        validate_band(band, Carrier::Electron, &format!("{path}.electron"))?;
    }
    if run.run_type.has_phonons() {
        let band = required_band(&block.phonon, &format!("{path}.phonon"))?;
        validate_band(band, Carrier::Phonon, &format!("{path}.phonon"))?;
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Carrier {
    Electron,
    Phonon,
}

fn required_band<'a>(band: &'a Option<BandDef>, path: &str) -> Result<&'a BandDef, ValidationError> {
    band.as_ref().ok_or_else(|| ValidationError::Missing {
        field: path.to_string(),
        reason: "band required by run_type".to_string(),
    })
}

fn validate_band(band: &BandDef, carrier: Carrier, path: &str) -> Result<(), ValidationError> {
    let table_path = format!("{path}.table");
    match &band.table {
        BandTableDef::Explicit {
            energies_j,
            dos_weights,
            relaxation_times_s,
        } => {
            if energies_j.is_empty() {
                return Err(invalid(format!("{table_path}.energies_j"), "[]", "must not be empty"));
            }
            if dos_weights.len() != energies_j.len() {
                return Err(length_mismatch(&format!("{table_path}.dos_weights"), dos_weights.len(), energies_j.len()));
            }
            for (i, &e) in energies_j.iter().enumerate() {
                let field = format!("{table_path}.energies_j[{i}]");
                match carrier {
                    Carrier::Electron if !e.is_finite() => return Err(invalid(field, e, "must be finite")),
                    Carrier::Phonon => positive(&field, e)?,
                    Carrier::Electron => {}
                }
            }
            for (i, &w) in dos_weights.iter().enumerate() {
                non_negative(&format!("{table_path}.dos_weights[{i}]"), w)?;
            }
            if let Some(taus) = relaxation_times_s {
                if taus.len() != energies_j.len() {
                    return Err(length_mismatch(
                        &format!("{table_path}.relaxation_times_s"),
                        taus.len(),
                        energies_j.len(),
                    ));
                }
                for (i, &tau) in taus.iter().enumerate() {
                    positive(&format!("{table_path}.relaxation_times_s[{i}]"), tau)?;
                }
            }
        }
        BandTableDef::Uniform {
            e_min_j,
            e_max_j,
            count,
            dos_weight,
        } => {
            if *count == 0 {
                return Err(invalid(format!("{table_path}.count"), 0, "must be at least 1"));
            }
            match carrier {
                Carrier::Electron => finite(&format!("{table_path}.e_min_j"), *e_min_j)?,
                Carrier::Phonon => positive(&format!("{table_path}.e_min_j"), *e_min_j)?,
            }
            finite(&format!("{table_path}.e_max_j"), *e_max_j)?;
            if *count > 1 && e_max_j <= e_min_j {
                return Err(invalid(
                    format!("{table_path}.e_max_j"),
                    e_max_j,
                    "must exceed e_min_j when count > 1",
                ));
            }
            non_negative(&format!("{table_path}.dos_weight"), *dos_weight)?;
        }
    }

    match band.relaxation_time_s {
        Some(tau) => positive(&format!("{path}.relaxation_time_s"), tau)?,
        None if band.table.relaxation_times_s().is_none() => {
            return Err(ValidationError::Missing {
                field: format!("{path}.relaxation_time_s"),
                reason: "needed to derive relaxation times the table does not list".to_string(),
            });
        }
        None => {}
    }

    match carrier {
        Carrier::Electron => match band.effective_mass {
            Some(mass) => positive(&format!("{path}.effective_mass"), mass)?,
            None => {
                return Err(ValidationError::Missing {
                    field: format!("{path}.effective_mass"),
                    reason: "electron bands need an effective mass".to_string(),
                });
            }
        },
        Carrier::Phonon => match band.group_velocity_m_s {
            Some(v) => non_negative(&format!("{path}.group_velocity_m_s"), v)?,
            None => {
                return Err(ValidationError::Missing {
                    field: format!("{path}.group_velocity_m_s"),
                    reason: "phonon bands need a group velocity".to_string(),
                });
            }
        },
    }
    Ok(())
}

fn invalid(field: String, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn length_mismatch(field: &str, got: usize, expected: usize) -> ValidationError {
    invalid(
        field.to_string(),
        format!("{got} entries"),
        &format!("must match the {expected} energies"),
    )
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field.to_string(), value, "must be positive and finite"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field.to_string(), value, "must be non-negative and finite"));
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field.to_string(), value, "must be finite"));
    }
    Ok(())
}
