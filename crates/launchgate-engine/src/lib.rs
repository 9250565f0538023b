#![forbid(unsafe_code)]

pub mod approvers;
pub mod fetch;
pub mod gates;
pub mod slo;
pub mod state;

#[cfg(test)]
mod testing;
