pub mod detection;
pub mod encryption;
pub mod formatting;
pub mod lvm;
pub mod partition;
pub mod partitioning;
pub mod planner;
