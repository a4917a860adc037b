//! HTTP handlers

pub mod features;
pub mod health;
pub mod predict;
pub mod sample;

#[cfg(test)]
mod tests;
