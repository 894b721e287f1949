//! Command-line control of LIFX lights.
//!
//! The binary is a thin layer over [lifx_client]: [cli] describes the arguments, [light] runs
//! the `light` subcommands against any [lifx_client::Client].

pub mod cli;
pub mod duration;
pub mod light;
mod table;
