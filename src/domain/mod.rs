// Domain layer: model types and the ports adapters implement.

pub mod model;
pub mod ports;
