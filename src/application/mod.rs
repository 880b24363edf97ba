//! Application layer: the order engine orchestrating validation, the
//! serialized commit protocol, and the thin catalog/order access layer.

pub mod engine;
