//! Cortex Arbitration - resource-constrained competition between demands
//!
//! One arbitration round:
//!
//! 1. [`InteractionAnalyzer`] derives pairwise facilitation/interference
//!    from declared needs and relationships.
//! 2. [`CompetitionEngine::compete`] relaxes activations with lateral
//!    inhibition for a fixed number of Jacobi iterations.
//! 3. [`CompetitionEngine::select_active`] walks demands by activation and
//!    grants what the [`ResourcePool`] can hold, without backtracking.
//! 4. [`CompetitionTracker`] records the round; [`DemandLedger`] applies the
//!    resulting lifecycle transitions.
//!
//! Allocation refusal is never an error. A demand that cannot be granted
//! waits, and shows up in the waiting counts and starvation diagnostics.

#![deny(unsafe_code)]

pub mod competition;
pub mod config;
pub mod error;
pub mod interaction;
pub mod ledger;
pub mod pool;
pub mod tracker;

pub use competition::{CompetitionEngine, Selection};
pub use config::{CompetitionConfig, ExcitationWeights, InteractionWeights, PoolConfig};
pub use error::{ArbitrationError, ArbitrationResult};
pub use interaction::{fingerprint, pair_strength, Fingerprint, InteractionAnalyzer, InteractionMatrix};
pub use ledger::DemandLedger;
pub use pool::{PoolSnapshot, ResourcePool};
pub use tracker::{CompetitionField, CompetitionSnapshot, CompetitionTracker};
