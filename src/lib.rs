// src/lib.rs

pub mod autosave;
pub mod config;
pub mod core;
pub mod error;
pub mod persistence;
pub use crate::config::LedgerConfig;
pub use crate::core::ledger::Ledger;
pub use crate::error::{AnnotatorError, Result};
