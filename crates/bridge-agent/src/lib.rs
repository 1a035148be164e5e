//! Peripheral bridge agent - hosts the bridge behind a JSON-lines channel

pub mod host;
