//! Configuration management for portsweep.
//!
//! Provides XDG-compliant storage of scan defaults.

mod settings;

pub use settings::{AppSettings, Paths};
