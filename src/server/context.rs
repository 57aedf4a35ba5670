//! Shared server context
//!
//! Read-only state every session task holds a handle to.

use std::io;
use std::sync::Arc;

use crate::auth::{Authenticator, ConfigAuthenticator, CredentialStore};
use crate::config::ServerConfig;
use crate::storage::{Filesystem, VirtualFilesystem};

/// Configuration plus the storage and credential capabilities.
///
/// Both capabilities are safe for concurrent use from all sessions.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub config: ServerConfig,
    pub vfs: VirtualFilesystem,
    pub authenticator: Arc<dyn Authenticator>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        vfs: VirtualFilesystem,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            vfs,
            authenticator,
        }
    }

    /// Context with the local filesystem backend rooted at the configured
    /// server root and the configuration-driven credential check.
    ///
    /// The root directory must already exist.
    pub fn from_config(config: ServerConfig) -> io::Result<Self> {
        let backend = Filesystem::new(config.server_root_path())?;
        let vfs = VirtualFilesystem::new(Arc::new(backend));
        let authenticator = ConfigAuthenticator::new(CredentialStore::from_config(&config.auth));
        Ok(Self::new(config, vfs, Arc::new(authenticator)))
    }
}
