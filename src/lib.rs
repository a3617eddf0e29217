//! Cost-optimal decarbonisation pathways for long-haul freight transport.
//!
//! A model directory is loaded into an [`registry::EntityRegistry`], turned into a mixed-integer
//! linear programme by [`optimisation::build_problem`] and solved with HiGHS. The results are
//! written out as CSV files by [`output::DataWriter`].
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod fuel;
pub mod id;
pub mod input;
pub mod log;
pub mod mode;
pub mod model;
pub mod network;
pub mod od_pair;
pub mod optimisation;
pub mod output;
pub mod pathway;
pub mod registry;
pub mod results;
pub mod settings;
pub mod temporal;
pub mod unit;
pub mod vehicle;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the folder where the program settings are kept.
///
/// Falls back to the current folder if the platform has no config folder.
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("freightpath");

    path
}
