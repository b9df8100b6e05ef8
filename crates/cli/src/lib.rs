//! Public library modules for the CLI crate
pub mod eval;
pub mod server;
