//! Core display-engine logic for beacon.

pub mod services;

pub use services::*;
