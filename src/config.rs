use serde::{Deserialize, Serialize};

/// Runtime knobs that change behavior rather than deployment wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// When true (the default), students may jump to any lecture or quiz
    /// from the sidebar. When false, navigation is linear: a jump target is
    /// reachable only once everything before it in document order is done.
    pub free_navigation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            free_navigation: true,
        }
    }
}
