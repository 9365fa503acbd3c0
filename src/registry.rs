use eyre::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Lookup of which speaker ids belong to registered enumerators.
pub trait EnumeratorRegistry: Send + Sync {
    fn is_enumerator(&self, speaker_id: &str) -> bool;

    fn enumerator_name(&self, speaker_id: &str) -> Option<String>;

    fn role_of(&self, speaker_id: &str) -> SpeakerRole {
        if self.is_enumerator(speaker_id) {
            SpeakerRole::Enumerator
        } else {
            SpeakerRole::Respondent
        }
    }
}

/// Which side of the interview a speaker is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    Enumerator,
    Respondent,
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakerRole::Enumerator => f.write_str("enumerator"),
            SpeakerRole::Respondent => f.write_str("respondent"),
        }
    }
}

/// Enumerator speaker ids mapped to display names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumeratorList {
    names: HashMap<String, String>,
}

impl EnumeratorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `{"speaker_id": "name"}`.
    ///
    /// A missing file gives an empty list, since a fresh deployment has no
    /// enumerators registered yet. Unreadable or malformed files are errors.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Enumerator list not found at {}, using empty list", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("failed to read {}", path.display()))
            }
        };
        let list: Self = serde_json::from_str(&text)
            .wrap_err_with(|| format!("malformed enumerator list {}", path.display()))?;
        info!("Loaded {} enumerators from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl EnumeratorRegistry for EnumeratorList {
    fn is_enumerator(&self, speaker_id: &str) -> bool {
        self.names.contains_key(speaker_id)
    }

    fn enumerator_name(&self, speaker_id: &str) -> Option<String> {
        self.names.get(speaker_id).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnumeratorList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
