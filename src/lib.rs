//! `microsim` facade: the simulation engine plus the command-line shell.

pub mod cli;

pub use microsim_core::*;
pub use microsim_data as data;
