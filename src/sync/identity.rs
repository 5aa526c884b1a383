//! Per-device client identity, generated once and persisted.

use std::{
    env, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_IDENTITY_PATH: &str = ".roulette/identity.json";
const IDENTITY_PATH_ENV: &str = "ROULETTE_IDENTITY_PATH";

/// Failures while reading or writing the identity file.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read identity file `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write identity file `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Stable identifier of one client device. Keys `presence/*` and `votes/*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
    pub client_id: String,
}

impl ClientIdentity {
    /// Fresh random identity that is not persisted anywhere.
    pub fn generate() -> Self {
        Self {
            client_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Wrap an identifier supplied by a remote device.
    pub fn from_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    /// Identity file location, honouring `ROULETTE_IDENTITY_PATH`.
    pub fn default_path() -> PathBuf {
        env::var_os(IDENTITY_PATH_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IDENTITY_PATH))
    }

    /// Reuse the identity stored at `path`, or generate and store a new one.
    ///
    /// A corrupt file is replaced rather than treated as fatal.
    pub fn load_or_create(path: &Path) -> Result<Self, IdentityError> {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(identity) if !identity.client_id.is_empty() => return Ok(identity),
                Ok(_) => warn!(path = %path.display(), "identity file has an empty id; regenerating"),
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse identity file; regenerating"
                ),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(IdentityError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let identity = Self::generate();
        identity.store(path)?;
        info!(path = %path.display(), client_id = %identity.client_id, "created client identity");
        Ok(identity)
    }

    fn store(&self, path: &Path) -> Result<(), IdentityError> {
        let write_err = |source| IdentityError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|err| write_err(io::Error::new(ErrorKind::InvalidData, err)))?;
        fs::write(path, contents).map_err(write_err)
    }
}
