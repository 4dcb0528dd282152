/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Settings resource lookup.
//!
//! A resource name is either an absolute path or a path relative to one of
//! an ordered list of roots. The first root holding a regular file wins.

use fixgate_core::error::ConfigError;
use fixgate_session::settings::SessionSettings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds `resource` under `roots`, or the current directory if `roots` is empty.
#[must_use]
pub fn locate(resource: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(resource);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    if roots.is_empty() {
        return path.is_file().then(|| path.to_path_buf());
    }
    roots
        .iter()
        .map(|root| root.join(path))
        .find(|candidate| candidate.is_file())
}

/// Locates and parses a settings resource.
///
/// # Errors
/// Returns `ConfigError::InvalidArgument` if the resource is empty or cannot
/// be found, and any error of [`SessionSettings::load`] otherwise.
pub fn load(resource: &str, roots: &[PathBuf]) -> Result<SessionSettings, ConfigError> {
    if resource.trim().is_empty() {
        return Err(ConfigError::InvalidArgument(
            "settings resource name is empty".to_string(),
        ));
    }
    let path = locate(resource, roots).ok_or_else(|| {
        ConfigError::InvalidArgument(format!("settings resource '{resource}' not found"))
    })?;
    debug!(path = %path.display(), "loading settings");
    SessionSettings::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DOCUMENT: &str = r#"
[[session]]
BeginString = "FIX.4.2"
SenderCompID = "MARKET"
TargetCompID = "TRADER"
ConnectionType = "acceptor"
"#;

    #[test]
    fn test_locate_in_roots_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("engine.toml"), DOCUMENT).unwrap();

        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            locate("engine.toml", &roots),
            Some(second.path().join("engine.toml"))
        );

        fs::write(first.path().join("engine.toml"), DOCUMENT).unwrap();
        assert_eq!(
            locate("engine.toml", &roots),
            Some(first.path().join("engine.toml"))
        );
    }

    #[test]
    fn test_locate_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, DOCUMENT).unwrap();

        let elsewhere = tempfile::tempdir().unwrap();
        let resource = path.to_string_lossy().into_owned();
        assert_eq!(locate(&resource, &[elsewhere.path().to_path_buf()]), Some(path));
    }

    #[test]
    fn test_load_resource() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("engine.toml"), DOCUMENT).unwrap();

        let settings = load("engine.toml", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn test_missing_resource_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let roots = [dir.path().to_path_buf()];
        assert!(matches!(
            load("bogus.cfg", &roots),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(load("  ", &roots), Err(ConfigError::InvalidArgument(_))));
        // a directory is not a resource
        fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(matches!(
            load("nested", &roots),
            Err(ConfigError::InvalidArgument(_))
        ));
    }
}
