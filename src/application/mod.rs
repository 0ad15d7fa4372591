//! Application services layer.

pub mod articles;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod tags;
pub mod transfer;
