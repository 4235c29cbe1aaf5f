//! Data model shared by every simulator.

pub mod matrix;
pub mod rows;
pub mod state;
pub mod trajectory;
