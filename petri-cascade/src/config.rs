use derive_builder::Builder;

/// Default for [`NetConfig::max_cascade_depth`], small enough to fit the default thread stack.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 256;

/// Runtime settings of a [`PetriNet`](crate::net::PetriNet).
///
/// ```
/// use petri_cascade::{NetConfigBuilder, DEFAULT_MAX_CASCADE_DEPTH};
///
/// let config = NetConfigBuilder::default().strict_injection(true).build().unwrap();
/// assert_eq!(config.max_cascade_depth, DEFAULT_MAX_CASCADE_DEPTH);
/// ```
#[derive(Builder, Clone, Debug)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NetConfig {
    /// Number of nested place forwards a single injection may cause before it is aborted.
    #[builder(default = "DEFAULT_MAX_CASCADE_DEPTH")]
    pub max_cascade_depth: usize,
    /// Injecting into an unknown source fails instead of being ignored.
    #[builder(default)]
    pub strict_injection: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig { max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH, strict_injection: false }
    }
}

impl NetConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        match self.max_cascade_depth {
            Some(0) => Err("max_cascade_depth must be at least 1".into()),
            _ => Ok(()),
        }
    }
}
