//! Runtime plumbing shared by the messaging module.

pub mod runtime;
