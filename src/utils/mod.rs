//! Utility modules

pub mod network;
pub mod parsers;
pub mod text;
