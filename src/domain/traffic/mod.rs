//! Background traffic: a periodic actor that adds random play time to every
//! metadata row, racing the request path over the same table.

pub mod simulator;

pub use simulator::{TickReport, TrafficHandle, TrafficSimulator, MIN_PERIOD};
