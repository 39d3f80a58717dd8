//! CLI command implementations.

mod check;
mod config;
mod hibernate;

pub use check::{run_check, CheckArgs};
pub use config::{run_config, ConfigArgs};
pub use hibernate::{run_hibernate, HibernateArgs};
