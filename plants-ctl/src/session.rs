use std::{io, path::Path};

use anyhow::Context;
use plants_client::SavedSession;

/// Saved session for `host`, if there is one. Sessions saved against another
/// host are left alone and ignored.
pub fn load(path: &Path, host: &str) -> anyhow::Result<Option<SavedSession>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading session file {path:?}")),
    };
    let saved: SavedSession = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing session file {path:?}"))?;
    if saved.host != host {
        tracing::info!(saved = %saved.host, host, "ignoring session saved for another host");
        return Ok(None);
    }
    Ok(Some(saved))
}

/// Writes the session, or removes the file when there is nothing to keep
pub fn store(path: &Path, session: Option<&SavedSession>) -> anyhow::Result<()> {
    match session {
        Some(s) => {
            let json = serde_json::to_vec_pretty(s).context("serializing session")?;
            std::fs::write(path, json).with_context(|| format!("writing session file {path:?}"))
        }
        None => match std::fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing session file {path:?}"))
            }
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use plants_client::api::AccessToken;

    use super::*;

    fn saved(host: &str) -> SavedSession {
        SavedSession {
            host: String::from(host),
            access_token: Some(AccessToken(String::from("a.b.c"))),
            refresh_token: Some(String::from("r3fr3sh")),
            remember_me: true,
        }
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        assert_eq!(load(&path, "http://localhost:8080").unwrap(), None);

        store(&path, Some(&saved("http://localhost:8080"))).unwrap();
        assert_eq!(
            load(&path, "http://localhost:8080").unwrap(),
            Some(saved("http://localhost:8080"))
        );
        assert_eq!(load(&path, "https://plants.example").unwrap(), None);

        store(&path, None).unwrap();
        assert!(!path.exists());
        store(&path, None).unwrap();
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path, "http://localhost:8080").is_err());
    }
}
