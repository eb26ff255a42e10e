#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod messaging;
pub mod platform;
