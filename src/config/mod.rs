// src/config/mod.rs
pub mod relay;

pub use relay::{Settings, Tunables};
