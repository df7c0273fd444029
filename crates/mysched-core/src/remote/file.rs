//! JSON document on disk

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::RemoteUserData;
use crate::models::UserData;
use crate::Result;

/// User data kept as a JSON file, e.g. in a synced folder.
#[derive(Debug, Clone)]
pub struct FileRemote {
    path: PathBuf,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling scratch file, unique per process and per push so concurrent
    /// writers never share one.
    fn temp_path(&self) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);

        let mut name = std::ffi::OsString::from(".");
        if let Some(file_name) = self.path.file_name() {
            name.push(file_name);
        }
        name.push(format!(
            ".{}.{}.{}.tmp",
            std::process::id(),
            crate::util::now_millis(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        self.path.with_file_name(name)
    }
}

impl RemoteUserData for FileRemote {
    async fn fetch(&self) -> Result<UserData> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => UserData::from_json_str(&raw),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No remote file at {} yet", self.path.display());
                Ok(UserData::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn push(&self, data: &UserData) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, data.to_json_string()?).await?;
        if let Err(error) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(error.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReservationStatus, ReservedSession};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_empty_user_data() {
        let tmp = tempdir().unwrap();
        let remote = FileRemote::new(tmp.path().join("absent.json"));
        assert!(remote.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_then_fetch_returns_document() {
        let tmp = tempdir().unwrap();
        let remote = FileRemote::new(tmp.path().join("sync").join("user.json"));

        let mut data = UserData::default();
        data.insert_reservation(ReservedSession::new("s2", ReservationStatus::Reserved, 200));
        remote.push(&data).await.unwrap();

        assert_eq!(remote.fetch().await.unwrap(), data);
        assert_eq!(leftover_temp_files(&tmp.path().join("sync")), 0);
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[test]
    fn temp_paths_are_unique_siblings() {
        let remote = FileRemote::new("/srv/sync/user.json");
        let first = remote.temp_path();
        let second = remote.temp_path();

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/srv/sync")));
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".user.json."));
        assert!(name.ends_with(".tmp"));
    }

    #[tokio::test]
    async fn concurrent_pushes_leave_one_valid_document() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("user.json");
        let first = FileRemote::new(&path);
        let second = FileRemote::new(&path);

        let mut phone = UserData::default();
        phone.insert_reservation(ReservedSession::new("s1", ReservationStatus::Reserved, 100));
        let mut laptop = UserData::default();
        laptop.insert_reservation(ReservedSession::new("s2", ReservationStatus::Waitlisted, 200));

        let (a, b) = tokio::join!(first.push(&phone), second.push(&laptop));
        a.unwrap();
        b.unwrap();

        let stored = first.fetch().await.unwrap();
        assert!(stored == phone || stored == laptop);
        assert_eq!(leftover_temp_files(tmp.path()), 0);
    }

    #[tokio::test]
    async fn blank_file_is_empty_user_data() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("user.json");
        std::fs::write(&path, "\n").unwrap();

        assert!(FileRemote::new(path).fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_a_serialization_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("user.json");
        std::fs::write(&path, "{not json").unwrap();

        let error = FileRemote::new(path).fetch().await.unwrap_err();
        assert!(matches!(error, crate::Error::Serialization(_)));
    }
}
