//! Interactive, menu-driven Arch Linux installer.
//!
//! The operator fills an [`config::InstallConfig`] through the main menu,
//! then [`pipeline::run`] applies it to the target disk stage by stage.
//! Every command goes through [`cmd::CommandRunner`] and every question
//! through [`prompt::Prompt`], so the whole flow runs against test doubles.

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod lsblk;
pub mod menu;
pub mod pipeline;
pub mod precheck;
pub mod progress;
pub mod prompt;
pub mod session;
pub mod steps;
pub mod ui;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;
