//! Flutter bridge for the SmartDay core.

pub mod api;
