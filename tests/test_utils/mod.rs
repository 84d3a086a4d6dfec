pub mod collector;

pub use collector::{Collector, PlainTcpConnector};
