//! Coordinate transformations for the KMA forecast grid.
//!
//! Implements the grid projection from scratch without external dependencies.

pub mod lambert;

pub use lambert::{LambertConformal, ProjectionError};
