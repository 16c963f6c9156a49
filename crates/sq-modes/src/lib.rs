//! Mode registry for SEAQT relaxation runs.
//!
//! A run is a chain of blocks; every block owns an ordered run of electron
//! modes and an ordered run of phonon modes. The registry concatenates them
//! as `[electron modes, block order][phonon modes, block order]`, which is
//! also the layout of the state vector integrated by `sq-sim`.
//!
//! Provides:
//! - `Species` and its dispatch table (occupation, moment factor, entropy,
//!   projection basis)
//! - `Mode` and `BlockInfo` records
//! - `BlockLayout` index-range arithmetic
//! - `RegistryBuilder`, which validates inputs and derives missing
//!   relaxation times from block geometry

pub mod builder;
pub mod error;
pub mod layout;
pub mod mode;
pub mod registry;
pub mod species;

pub use builder::{BandInput, BlockInput, CarrierModel, RegistryBuilder, derive_relaxation_time};
pub use error::{ModesError, ModesResult};
pub use layout::BlockLayout;
pub use mode::{BlockInfo, Mode};
pub use registry::{ModeLocation, ModeRegistry};
pub use species::{ProjectionBasis, Species, SpeciesRules, SpeciesSet};
