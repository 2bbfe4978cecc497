//! Session and delegation control core for named agent runs.
//!
//! The crate sits between a catalog of agent definitions and an external
//! execution engine. It owns three pieces of state and every rule about how
//! they change:
//!
//! - the [`SessionLedger`], an in-memory table of every session started in
//!   this process, with the interrupt handles of the active ones;
//! - the [`DelegationRegistry`], which maps in-flight session ids to their
//!   position in the delegation tree so nested calls can be depth- and
//!   cycle-checked;
//! - the [`Conductor`], which validates requests, drives engine event
//!   streams to completion, and folds them into result records.
//!
//! Engines are pluggable through [`ExecutionEngine`]; everything observable
//! by callers is expressed in `conductor-protocol` types.

mod batch;
pub mod catalog;
pub mod config;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod ledger;

pub use catalog::AgentCatalog;
pub use catalog::AgentDefinition;
pub use config::Config;
pub use delegation::DelegationContext;
pub use delegation::DelegationRegistry;
pub use engine::ExecutionEngine;
pub use engine::ExecutionHandle;
pub use engine::ExecutionRequest;
pub use engine::ExecutionRun;
pub use error::ConductorError;
pub use invoker::Conductor;
pub use invoker::DelegateRequest;
pub use invoker::RunRequest;
pub use ledger::SessionFilter;
pub use ledger::SessionLedger;
pub use ledger::SessionRecord;
