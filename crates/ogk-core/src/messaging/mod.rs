//! Outbound messaging: the messenger port and the chunked digest sender.

pub mod chunked;
pub mod port;
pub mod types;
