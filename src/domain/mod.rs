//! Domain layer - Port definitions
//!
//! This module defines the capability traits (ports) that Fusion clients
//! implement, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
