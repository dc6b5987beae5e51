//! Hoopow: the proof-of-work evaluation core of a DAG ledger node.
//!
//! Given a block header this crate derives the numeric work value used to
//! admit a block against its difficulty target and to compute the block's
//! level for multi-level DAG pruning.

pub mod core;
pub mod crypto;
pub mod miner;
pub mod pow;
