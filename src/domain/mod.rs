//! Domain entities and request types, independent of storage.

pub mod order;
pub mod product;
