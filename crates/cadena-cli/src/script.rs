//! JSON session scripts.
//!
//! A script is a timeline of store and chain operations:
//!
//! ```json
//! {
//!   "events": [
//!     { "at": 0.0, "action": "enable" },
//!     { "at": 2.5, "action": "set", "param": "threshold", "value": -40 },
//!     { "at": 5.0, "action": "disable" }
//!   ]
//! }
//! ```
//!
//! Events are applied in time order while the input renders, so the
//! output file captures exactly what a listener would have heard.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// A parsed session script, events sorted by time.
#[derive(Debug, Deserialize)]
pub struct Script {
    /// Timeline entries.
    pub events: Vec<ScriptEvent>,
}

/// One timeline entry.
#[derive(Debug, Deserialize)]
pub struct ScriptEvent {
    /// Offset from the start of the input, in seconds.
    pub at: f64,
    /// What to do when the timeline reaches `at`.
    #[serde(flatten)]
    pub action: ScriptAction,
}

/// The operation an event performs.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Route through the compressor.
    Enable,
    /// Route around the compressor.
    Disable,
    /// Flip the enabled flag.
    Toggle,
    /// Write one tunable.
    Set {
        /// Parameter name as accepted by the store.
        param: String,
        /// Raw value; the store clamps it.
        value: f32,
    },
    /// Tear the chain down.
    Dispose,
}

impl fmt::Display for ScriptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enable => write!(f, "enable"),
            Self::Disable => write!(f, "disable"),
            Self::Toggle => write!(f, "toggle"),
            Self::Set { param, value } => write!(f, "set {param} = {value}"),
            Self::Dispose => write!(f, "dispose"),
        }
    }
}

/// Loads and sorts a script file.
pub fn load_script<P: AsRef<Path>>(path: P) -> anyhow::Result<Script> {
    let text = std::fs::read_to_string(&path)?;
    let mut script: Script = serde_json::from_str(&text)?;
    script.events.sort_by(|a, b| a.at.total_cmp(&b.at));
    Ok(script)
}
