//! Built-in knowledge tools.

pub mod fixed;
pub mod wikipedia;
