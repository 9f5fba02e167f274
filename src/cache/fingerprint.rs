// Tue Jan 13 2026 - Alex

use crate::cache::error::CacheError;
use crate::config::FingerprintMode;
use crate::model::{Module, ModuleLocation};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a module's on-disk content at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModuleFingerprint {
    pub size: u64,
    pub modified_nanos: u64,
    #[serde(default)]
    pub content_hash: Option<u64>,
}

impl ModuleFingerprint {
    pub fn last_write_time(&self) -> SystemTime {
        UNIX_EPOCH + std::time::Duration::from_nanos(self.modified_nanos)
    }
}

pub trait FingerprintProbe: Send + Sync {
    /// Current fingerprint. Dynamic modules yield the default fingerprint.
    fn probe(&self, module: &Module) -> Result<ModuleFingerprint, CacheError>;

    /// Last write time, `None` for dynamic modules.
    fn last_modified(&self, module: &Module) -> Result<Option<SystemTime>, CacheError>;
}

pub struct FileSystemProbe {
    mode: FingerprintMode,
}

impl FileSystemProbe {
    pub fn new(mode: FingerprintMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FingerprintMode {
        self.mode
    }

    fn fingerprint_file(&self, path: &Path) -> std::io::Result<ModuleFingerprint> {
        let metadata = fs::metadata(path)?;
        let modified_nanos = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().min(u64::MAX as u128) as u64)
            .unwrap_or(0);

        let content_hash = match self.mode {
            FingerprintMode::Metadata => None,
            FingerprintMode::ContentHash => Some(hash_file(path, metadata.len())?),
        };

        Ok(ModuleFingerprint {
            size: metadata.len(),
            modified_nanos,
            content_hash,
        })
    }
}

impl Default for FileSystemProbe {
    fn default() -> Self {
        Self::new(FingerprintMode::default())
    }
}

impl FingerprintProbe for FileSystemProbe {
    fn probe(&self, module: &Module) -> Result<ModuleFingerprint, CacheError> {
        match module.location() {
            ModuleLocation::Dynamic => Ok(ModuleFingerprint::default()),
            ModuleLocation::File(path) => self.fingerprint_file(path).map_err(|source| CacheError::Fingerprint {
                module: module.identity(),
                source,
            }),
        }
    }

    fn last_modified(&self, module: &Module) -> Result<Option<SystemTime>, CacheError> {
        match module.location() {
            ModuleLocation::Dynamic => Ok(None),
            ModuleLocation::File(path) => fs::metadata(path)
                .and_then(|m| m.modified())
                .map(Some)
                .map_err(|source| CacheError::Fingerprint {
                    module: module.identity(),
                    source,
                }),
        }
    }
}

fn hash_file(path: &Path, len: u64) -> std::io::Result<u64> {
    // Zero-length files cannot be mapped on every platform.
    if len == 0 {
        return Ok(fnv1a_64(&[]));
    }
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file) }?;
    Ok(fnv1a_64(&mmap))
}

pub fn fnv1a_64(data: &[u8]) -> u64 {
    const FNV_PRIME: u64 = 0x00000100000001B3;
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;

    data.iter()
        .fold(FNV_OFFSET, |hash, &byte| (hash ^ byte as u64).wrapping_mul(FNV_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_dynamic_module() {
        let probe = FileSystemProbe::default();
        let module = Module::new("Dyn", "1");
        assert_eq!(probe.probe(&module).unwrap(), ModuleFingerprint::default());
        assert_eq!(probe.last_modified(&module).unwrap(), None);
    }

    #[test]
    fn test_metadata_fingerprint_tracks_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first").unwrap();
        file.flush().unwrap();

        let module = Module::from_file("M", "1", file.path());
        let probe = FileSystemProbe::new(FingerprintMode::Metadata);
        let before = probe.probe(&module).unwrap();
        assert_eq!(before.size, 5);
        assert!(before.content_hash.is_none());

        file.write_all(b" and more").unwrap();
        file.flush().unwrap();
        assert_ne!(probe.probe(&module).unwrap(), before);
    }

    #[test]
    fn test_content_hash_fingerprint() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"module bytes").unwrap();
        file.flush().unwrap();

        let module = Module::from_file("M", "1", file.path());
        let probe = FileSystemProbe::new(FingerprintMode::ContentHash);
        let fp = probe.probe(&module).unwrap();
        assert_eq!(fp.content_hash, Some(fnv1a_64(b"module bytes")));

        let empty = NamedTempFile::new().unwrap();
        let fp = probe.probe(&Module::from_file("E", "1", empty.path())).unwrap();
        assert_eq!(fp.content_hash, Some(fnv1a_64(b"")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let probe = FileSystemProbe::default();
        let module = Module::from_file("Gone", "1", "/nonexistent/definitely/missing.mod");
        assert!(matches!(probe.probe(&module), Err(CacheError::Fingerprint { .. })));
        assert!(probe.last_modified(&module).is_err());
    }
}
