use std::fs;
use std::path::Path;

use crate::model::user::User;

const SESSION_FILE: &str = "session.json";

/// Read the signed-in user from session.json in the data directory.
/// A missing or unreadable file means nobody is signed in.
pub fn read_session(data_dir: &Path) -> Option<User> {
    let path = data_dir.join(SESSION_FILE);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed session file");
            None
        }
    }
}

/// Write session.json to the data directory, creating the directory first
pub fn write_session(data_dir: &Path, user: &User) -> Result<(), std::io::Error> {
    fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(user)?;
    fs::write(data_dir.join(SESSION_FILE), content)
}

/// Remove session.json. Not an error if there was no session.
pub fn clear_session(data_dir: &Path) -> Result<(), std::io::Error> {
    match fs::remove_file(data_dir.join(SESSION_FILE)) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let user = User::for_email("alice@example.com");
        write_session(dir.path(), &user).unwrap();
        assert_eq!(read_session(dir.path()), Some(user));
    }

    #[test]
    fn write_creates_missing_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        write_session(&nested, &User::for_email("a@b.c")).unwrap();
        assert!(read_session(&nested).is_some());
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_session(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SESSION_FILE), "not json {{{").unwrap();
        assert!(read_session(dir.path()).is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_session(dir.path(), &User::for_email("a@b.c")).unwrap();
        clear_session(dir.path()).unwrap();
        clear_session(dir.path()).unwrap();
        assert!(read_session(dir.path()).is_none());
    }
}
