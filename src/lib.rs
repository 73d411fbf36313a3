#![allow(clippy::collapsible_if)]

pub mod commands;
pub mod config;
pub mod datapack;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod placer;
pub mod scope;
pub mod session;

#[cfg(test)]
mod tests;
