//! Remote user data stores.
//!
//! The remote side holds one JSON document per user. Every backend only knows
//! how to fetch and replace that document; merging happens in [`crate::sync`].

mod file;
mod http;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

pub use file::FileRemote;
pub use http::HttpRemote;

use crate::models::UserData;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

/// A remote copy of the user's data.
#[allow(async_fn_in_trait)]
pub trait RemoteUserData {
    /// Fetch the current document. A store that holds nothing yet returns
    /// empty user data.
    async fn fetch(&self) -> Result<UserData>;

    /// Replace the document.
    async fn push(&self, data: &UserData) -> Result<()>;
}

/// Remote selected from configuration: a file path or an `http(s)://` URL.
#[derive(Debug, Clone)]
pub enum ConfiguredRemote {
    File(FileRemote),
    Http(HttpRemote),
}

impl ConfiguredRemote {
    pub fn from_location(location: &str, token: Option<String>) -> Result<Self> {
        let location = normalize_text_option(Some(location.to_string()))
            .ok_or_else(|| Error::Config("remote location must not be empty".to_string()))?;

        if is_http_url(&location) {
            Ok(Self::Http(HttpRemote::new(location, token)?))
        } else {
            Ok(Self::File(FileRemote::new(PathBuf::from(location))))
        }
    }
}

impl fmt::Display for ConfiguredRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(remote) => write!(f, "{}", remote.path().display()),
            Self::Http(remote) => f.write_str(remote.endpoint()),
        }
    }
}

impl RemoteUserData for ConfiguredRemote {
    async fn fetch(&self) -> Result<UserData> {
        match self {
            Self::File(remote) => remote.fetch().await,
            Self::Http(remote) => remote.fetch().await,
        }
    }

    async fn push(&self, data: &UserData) -> Result<()> {
        match self {
            Self::File(remote) => remote.push(data).await,
            Self::Http(remote) => remote.push(data).await,
        }
    }
}

/// In-process remote (primarily for tests).
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    data: Arc<Mutex<UserData>>,
    pushes: Arc<AtomicUsize>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new(data: UserData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            pushes: Arc::default(),
        }
    }

    /// Current contents.
    pub async fn data(&self) -> UserData {
        self.data.lock().await.clone()
    }

    /// How many times the document was replaced.
    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl RemoteUserData for MemoryRemote {
    async fn fetch(&self) -> Result<UserData> {
        Ok(self.data().await)
    }

    async fn push(&self, data: &UserData) -> Result<()> {
        *self.data.lock().await = data.clone();
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
