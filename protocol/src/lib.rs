//! Wire types shared across the conductor crates.
//!
//! Everything in this crate crosses a boundary: execution engines produce
//! [`EngineEvent`] streams, the control core emits the result records, and
//! the tool surface serializes both to callers. Field names and enum tags
//! are part of the contract and must stay stable.

mod events;
mod records;

pub use events::EngineEvent;
pub use events::StepAction;
pub use records::AgentRunResult;
pub use records::BatchResult;
pub use records::BatchTaskResult;
pub use records::BatchTaskSpec;
pub use records::CancelResult;
pub use records::DelegationResult;
pub use records::DelegationSnapshot;
pub use records::SessionSummary;
