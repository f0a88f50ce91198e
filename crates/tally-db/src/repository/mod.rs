//! # Repositories
//!
//! One repository per aggregate. Functions that take a
//! `&mut SqliteConnection` or a generic executor join the caller's
//! transaction; `&self` methods run on the pool.

pub mod audit_log;
pub mod catalog;
pub mod inventory;
pub mod journal;
pub mod sale;
pub mod tax_audit;
