// Domain layer: entities and ports (interfaces) towards collaborators.

pub mod model;
pub mod ports;
