use std::fs;
use std::path::Path;

use anyhow::Context;

use super::RegistryState;

/// Write the registry state as pretty JSON. Goes through a sibling temp file
/// so a crash mid-write never leaves a truncated snapshot behind.
pub fn save_snapshot(state: &RegistryState, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(state).context("failed to serialize registry state")?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to move snapshot to {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        markets = state.market_count,
        events = state.journal.len(),
        "Registry snapshot saved"
    );
    Ok(())
}

/// Load a snapshot if one exists. A snapshot that fails structural
/// validation is an error, never silently discarded.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Option<RegistryState>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let state: RegistryState = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    state
        .validate()
        .map_err(|e| anyhow::anyhow!("snapshot {} is inconsistent: {e}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        markets = state.market_count,
        events = state.journal.len(),
        "Registry snapshot loaded"
    );
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{harness, rain_market, t0};
    use crate::models::Identity;
    use chrono::Duration;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "oracle-registry-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let mut h = harness();
        let creator = Identity::from_low_u64(1);
        h.registry
            .create(rain_market(t0() + Duration::days(1)), &creator)
            .unwrap();
        h.registry.cancel(1, &creator).unwrap();

        let path = temp_path("restart");
        save_snapshot(h.registry.state(), &path).unwrap();
        let loaded = load_snapshot(&path).unwrap().expect("snapshot should exist");
        fs::remove_file(&path).ok();

        assert_eq!(&loaded, h.registry.state());
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let path = temp_path("missing");
        assert!(load_snapshot(&path).unwrap().is_none());
    }

    #[test]
    fn test_inconsistent_snapshot_rejected() {
        let h = harness();
        let mut state = h.registry.state().clone();
        state.market_count = 3;

        let path = temp_path("inconsistent");
        save_snapshot(&state, &path).unwrap();
        let result = load_snapshot(&path);
        fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
