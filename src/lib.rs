//! Bookstore application library
//!
//! Domain modules plus the bootstrap that wires settings, database, module
//! registry and HTTP server together.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::Application;
