//! In-memory speech cache keyed by a hash of the normalized text
//!
//! Bounded by entry count and age. Expired entries are dropped when looked
//! up; a full cache drops its single oldest entry when a new text arrives.
//! Lookups never refresh an entry's age.

use super::types::{CacheStats, TtsResponse};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct CachedAudio {
    response: TtsResponse,
    inserted_at: Instant,
    /// Breaks ties between entries inserted within one clock tick
    seq: u64,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, CachedAudio>,
    next_seq: u64,
}

pub struct TtsCache {
    entries: Mutex<Entries>,
    capacity: usize,
    ttl: Duration,
}

impl TtsCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Hex SHA-256 of the trimmed, lowercased text
    pub fn text_hash(text: &str) -> String {
        let digest = Sha256::digest(text.trim().to_lowercase().as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn get(&self, text: &str) -> Option<TtsResponse> {
        let hash = Self::text_hash(text);
        let mut entries = self.entries.lock();
        let expired = entries.map.get(&hash)?.inserted_at.elapsed() > self.ttl;
        if expired {
            debug!(hash = %hash, "Evicting expired speech cache entry");
            entries.map.remove(&hash);
            return None;
        }
        entries.map.get(&hash).map(|cached| cached.response.clone())
    }

    pub fn set(&self, text: &str, audio_data: Vec<u8>, content_type: impl Into<String>) {
        let hash = Self::text_hash(text);
        let mut entries = self.entries.lock();

        if !entries.map.contains_key(&hash) && entries.map.len() >= self.capacity {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, cached)| (cached.inserted_at, cached.seq))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!(hash = %oldest, "Speech cache full, evicting oldest entry");
                entries.map.remove(&oldest);
            }
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            hash,
            CachedAudio {
                response: TtsResponse {
                    audio_data,
                    content_type: content_type.into(),
                },
                inserted_at: Instant::now(),
                seq,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().map.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.map.len(),
            total_bytes: entries
                .map
                .values()
                .map(|cached| cached.response.audio_data.len())
                .sum(),
        }
    }
}

impl std::fmt::Debug for TtsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsCache")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> TtsCache {
        TtsCache::new(capacity, Duration::from_secs(60))
    }

    #[test]
    fn test_lookup_is_normalized() {
        let cache = cache(5);
        cache.set("  Hello World ", vec![1, 2, 3], "audio/wav");

        let hit = cache.get("hello world").unwrap();
        assert_eq!(hit.audio_data, vec![1, 2, 3]);
        assert_eq!(hit.content_type, "audio/wav");
        assert!(cache.get("hello there").is_none());
        assert_eq!(TtsCache::text_hash("ABC "), TtsCache::text_hash("abc"));
        assert_eq!(TtsCache::text_hash("abc").len(), 64);
    }

    #[test]
    fn test_evicts_exactly_the_oldest() {
        let cache = cache(3);
        for text in ["one", "two", "three"] {
            cache.set(text, text.as_bytes().to_vec(), "audio/wav");
        }
        // Lookups do not promote
        assert!(cache.get("one").is_some());

        cache.set("four", vec![4], "audio/wav");
        assert_eq!(cache.len(), 3);
        assert!(cache.get("one").is_none());
        assert!(cache.get("two").is_some());
        assert!(cache.get("four").is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_keeps_others() {
        let cache = cache(2);
        cache.set("a", vec![1], "audio/wav");
        cache.set("b", vec![2], "audio/wav");
        cache.set("A", vec![9, 9], "audio/mpeg");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b").unwrap().audio_data, vec![2]);
        assert_eq!(cache.get("a").unwrap().content_type, "audio/mpeg");
    }

    #[test]
    fn test_expired_entries_are_dropped_on_lookup() {
        let cache = TtsCache::new(5, Duration::from_millis(20));
        cache.set("hello", vec![0; 10], "audio/wav");
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("hello").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = cache(5);
        cache.set("a", vec![0; 100], "audio/wav");
        cache.set("b", vec![0; 28], "audio/wav");
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 2,
                total_bytes: 128
            }
        );

        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
