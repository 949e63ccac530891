//! Pipeline stages.

pub mod authorization;
pub mod cors;
pub mod identity;
pub mod validation;
