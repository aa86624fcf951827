//! Bootstrapping the new system: mirrors, debootstrap, base configuration.

pub mod bootstrap;
pub mod mirror;
pub mod netcfg;
pub mod system;
