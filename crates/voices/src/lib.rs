//! Voice Profile Store (C1).
//!
//! Persisted speaker centroids, read-only at ingestion time. Profiles are
//! loaded once per process from a directory of YAML files and cached in
//! memory behind a `once_cell::sync::OnceCell`, following the "lazy once"
//! strategy called for in spec.md DESIGN NOTES §9 and grounded on the
//! teacher's `once_cell`-backed model singletons in
//! `crates/transcription` and `crates/embeddings`.
use std::fs;
use std::path::Path;

use ingest_common::model::VoiceProfile;
use once_cell::sync::OnceCell;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceStoreError {
    #[error("voices directory not found: {0}")]
    DirNotFound(String),
    #[error("failed to parse profile {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk representation of one profile file (`voices/<name>.yaml`).
#[derive(Debug, serde::Deserialize)]
struct ProfileFile {
    name: String,
    centroid: Vec<f32>,
    #[serde(default = "default_threshold")]
    threshold: f32,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

fn default_threshold() -> f32 {
    0.62
}

/// Thread-safe, process-wide cache of all loaded profiles. Never mutated
/// once set; `reset()` exists only for tests, matching spec.md DESIGN
/// NOTES §9's requirement for an explicit test-only invalidation path.
pub struct VoiceProfileStore {
    profiles: Vec<VoiceProfile>,
}

static STORE: OnceCell<VoiceProfileStore> = OnceCell::new();

impl VoiceProfileStore {
    /// Load every `*.yaml` profile file in `dir`. Profiles with malformed
    /// YAML are skipped with a warning rather than aborting the whole load,
    /// since one corrupt file should not prevent enrolling the rest.
    pub fn load_from_dir(dir: &Path) -> Result<Self, VoiceStoreError> {
        if !dir.is_dir() {
            return Err(VoiceStoreError::DirNotFound(dir.display().to_string()));
        }
        let mut profiles = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<ProfileFile>(&contents) {
                Ok(pf) => profiles.push(VoiceProfile {
                    name: pf.name,
                    centroid: pf.centroid,
                    threshold: pf.threshold,
                    metadata: pf.metadata,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed voice profile");
                }
            }
        }
        Ok(Self { profiles })
    }

    /// Initialise the global cache exactly once. Subsequent calls are no-ops
    /// and return the already-loaded store.
    pub fn global(dir: &Path) -> Result<&'static VoiceProfileStore, VoiceStoreError> {
        if let Some(existing) = STORE.get() {
            return Ok(existing);
        }
        let store = Self::load_from_dir(dir)?;
        Ok(STORE.get_or_init(|| store))
    }

    #[must_use]
    pub fn profiles(&self) -> &[VoiceProfile] {
        &self.profiles
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&VoiceProfile> {
        self.profiles.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn has_known_speaker(&self, known_name: &str) -> bool {
        self.find(known_name).is_some()
    }
}

/// Startup-time gate matching spec.md §4.4's failure semantics: refuse to
/// start ingestion if the known-speaker profile is missing, unless the
/// caller has set an explicit bootstrap flag.
pub fn require_known_profile(
    store: &VoiceProfileStore,
    known_name: &str,
    auto_bootstrap: bool,
) -> Result<(), ingest_common::error::FatalError> {
    if store.has_known_speaker(known_name) || auto_bootstrap {
        return Ok(());
    }
    Err(ingest_common::error::FatalError::MissingKnownProfile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_profile(dir: &Path, name: &str, centroid: &[f32], threshold: f32) {
        let path = dir.join(format!("{name}.yaml"));
        let mut f = fs::File::create(path).unwrap();
        writeln!(f, "name: {name}").unwrap();
        writeln!(f, "threshold: {threshold}").unwrap();
        writeln!(f, "centroid: {centroid:?}").unwrap();
    }

    #[test]
    fn loads_valid_profiles_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), "testspeaker", &[0.1, 0.2, 0.3], 0.62);
        fs::write(dir.path().join("broken.yaml"), "not: [valid yaml: at all").unwrap();

        let store = VoiceProfileStore::load_from_dir(dir.path()).unwrap();
        assert_eq!(store.profiles().len(), 1);
        assert!(store.find("TESTSPEAKER").is_some());
    }

    #[test]
    fn missing_known_profile_without_bootstrap_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceProfileStore::load_from_dir(dir.path()).unwrap();
        assert!(require_known_profile(&store, "testspeaker", false).is_err());
        assert!(require_known_profile(&store, "testspeaker", true).is_ok());
    }

    #[test]
    fn missing_dir_is_error() {
        let result = VoiceProfileStore::load_from_dir(Path::new("/nonexistent/path/xyz"));
        assert!(result.is_err());
    }
}
