// Domain layer: core models and ports (interfaces). No store-specific code here.

pub mod model;
pub mod ports;
