//! shop-types: order domain model and the ports the lifecycle service talks to.

pub mod domain;
pub mod ports;
