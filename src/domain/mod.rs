//! Domain layer - value objects and typed outcomes, free of I/O.

pub mod foundation;
pub mod order;
pub mod processing;
