//! Host-facing contract, command router and stdio bridge.

pub mod contract;
pub mod router;
pub mod stdio;
