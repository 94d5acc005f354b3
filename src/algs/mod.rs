//! Communication backends and the message-passing helpers built on them.

pub mod collective;
pub mod communicator;
pub mod exchange;
pub mod wire;

pub use collective::{ScanResult, allreduce_sum, exclusive_scan_sum};
pub use exchange::{broadcast_others, gather_from_others};
