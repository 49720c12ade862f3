pub mod order;
pub mod placement;
