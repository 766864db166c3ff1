//! Sandboxed file access
//!
//! Hosts that confine disk access (security-scoped bookmarks and the like)
//! implement [`AccessCapability`]. The core holds an [`AccessScope`] for the
//! whole of a reconcile or extraction; dropping the scope ends access exactly
//! once, on the error path as well.

use crate::error::AccessError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Opaque token returned by [`AccessCapability::begin`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessHandle {
    pub id: u64,
    pub root: PathBuf,
}

/// Begin/end access to a user-selected root
pub trait AccessCapability: Send + Sync {
    fn begin(&self, root: &Path) -> Result<AccessHandle, AccessError>;
    fn end(&self, handle: AccessHandle) -> Result<(), AccessError>;
}

/// Capability for hosts without a sandbox: every root is accessible
#[derive(Debug, Default)]
pub struct UnrestrictedAccess {
    next_id: AtomicU64,
}

impl AccessCapability for UnrestrictedAccess {
    fn begin(&self, root: &Path) -> Result<AccessHandle, AccessError> {
        Ok(AccessHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            root: root.to_path_buf(),
        })
    }

    fn end(&self, _handle: AccessHandle) -> Result<(), AccessError> {
        Ok(())
    }
}

/// Capability that counts open handles; used to check scope balance
#[derive(Debug, Default)]
pub struct TrackedAccess {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, PathBuf>>,
    ended: AtomicU64,
}

impl TrackedAccess {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_count(&self) -> usize {
        self.open.lock().len()
    }

    pub fn ended_count(&self) -> u64 {
        self.ended.load(Ordering::SeqCst)
    }
}

impl AccessCapability for TrackedAccess {
    fn begin(&self, root: &Path) -> Result<AccessHandle, AccessError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.open.lock().insert(id, root.to_path_buf());
        Ok(AccessHandle {
            id,
            root: root.to_path_buf(),
        })
    }

    fn end(&self, handle: AccessHandle) -> Result<(), AccessError> {
        match self.open.lock().remove(&handle.id) {
            Some(_) => {
                self.ended.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(AccessError::NotBegun(handle.root)),
        }
    }
}

/// RAII guard over one begin/end pair
pub struct AccessScope<'a> {
    capability: &'a dyn AccessCapability,
    handle: Option<AccessHandle>,
}

impl<'a> AccessScope<'a> {
    pub fn begin(capability: &'a dyn AccessCapability, root: &Path) -> Result<Self, AccessError> {
        let handle = capability.begin(root)?;
        debug!(root = %root.display(), handle = handle.id, "Began file access");
        Ok(Self {
            capability,
            handle: Some(handle),
        })
    }

    /// End access now and report the result
    pub fn end(mut self) -> Result<(), AccessError> {
        match self.handle.take() {
            Some(handle) => self.capability.end(handle),
            None => Ok(()),
        }
    }
}

impl Drop for AccessScope<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let id = handle.id;
            if let Err(e) = self.capability.end(handle) {
                tracing::warn!(handle = id, error = %e, "Failed to end file access");
            }
        }
    }
}
