//! Turning an accepted layout into real partitions, volumes, and mounts.

pub mod fstab;
pub mod sequencer;

pub use sequencer::{Provisioner, TARGET_ROOT};
