// Tue Jan 13 2026 - Alex

use crate::cache::fingerprint::ModuleFingerprint;
use crate::model::RegistrationRecord;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub module: String,
    pub fingerprint: ModuleFingerprint,
    #[serde(default)]
    pub dynamic: bool,
    pub cached_at: SystemTime,
    pub records: Vec<RegistrationRecord>,
}

impl CacheEntry {
    pub fn new(module: String, fingerprint: ModuleFingerprint, dynamic: bool, records: Vec<RegistrationRecord>) -> Self {
        Self {
            module,
            fingerprint,
            dynamic,
            cached_at: SystemTime::now(),
            records,
        }
    }

    pub fn last_write_time(&self) -> SystemTime {
        self.fingerprint.last_write_time()
    }

    pub fn last_size(&self) -> u64 {
        self.fingerprint.size
    }

    /// Time since the entry was captured. A clock that moved backwards reads as zero.
    pub fn age(&self) -> Duration {
        self.cached_at.elapsed().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, max_age: Option<Duration>) -> bool {
        max_age.map_or(false, |max| self.age() > max)
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.module.len()
            + self.records.iter().map(RegistrationRecord::estimated_size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let mut entry = CacheEntry::new("M@1".into(), ModuleFingerprint::default(), false, Vec::new());
        assert!(!entry.is_expired(None));
        assert!(!entry.is_expired(Some(Duration::from_secs(60))));

        entry.cached_at = SystemTime::now() - Duration::from_secs(120);
        assert!(entry.is_expired(Some(Duration::from_secs(60))));
        assert!(!entry.is_expired(None));
    }

    #[test]
    fn test_estimated_bytes_grow_with_records() {
        let empty = CacheEntry::new("M@1".into(), ModuleFingerprint::default(), false, Vec::new());
        let full = CacheEntry::new(
            "M@1".into(),
            ModuleFingerprint::default(),
            false,
            vec![RegistrationRecord::new("IWidget", "Widget")],
        );
        assert!(full.estimated_bytes() > empty.estimated_bytes());
    }
}
