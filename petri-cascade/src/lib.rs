pub mod config;
pub mod error;
pub mod net;
pub mod registry;
pub mod trace;

pub use config::{NetConfig, NetConfigBuilder, NetConfigBuilderError, DEFAULT_MAX_CASCADE_DEPTH};
pub use error::{PetriError, Result};
