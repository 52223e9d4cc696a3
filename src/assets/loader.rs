use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::models::{ModelAsset, ModelSource};
use crate::utils::error::AssetError;

const COMPLETION_QUEUE_CAPACITY: usize = 100;

type ModelCache = Arc<Mutex<HashMap<PathBuf, Arc<ModelAsset>>>>;

/// A finished load, carrying back whatever tag the caller attached.
#[derive(Debug)]
pub struct LoadResult<T> {
    pub tag: T,
    pub path: PathBuf,
    pub result: Result<Arc<ModelAsset>, AssetError>,
}

/// Loads models on a small worker pool and hands results back over a
/// channel. Results are only observed when the owner calls [`drain`], so
/// the owner decides on which thread and at which point they are applied.
///
/// [`drain`]: AssetLoader::drain
pub struct AssetLoader<T> {
    pool: ThreadPool,
    source: Arc<dyn ModelSource>,
    cache: ModelCache,
    sender: Sender<LoadResult<T>>,
    receiver: Receiver<LoadResult<T>>,
    pending: usize,
}

impl<T: Send + 'static> AssetLoader<T> {
    pub fn new(source: Arc<dyn ModelSource>, threads: usize) -> Result<Self, AssetError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("asset-loader-{}", i))
            .build()?;
        let (sender, receiver) = bounded(COMPLETION_QUEUE_CAPACITY);
        Ok(Self {
            pool,
            source,
            cache: Arc::new(Mutex::new(HashMap::new())),
            sender,
            receiver,
            pending: 0,
        })
    }

    /// Queues a load. Models already loaded once are served from memory.
    pub fn request(&mut self, path: impl Into<PathBuf>, tag: T) {
        let path = path.into();
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let sender = self.sender.clone();
        self.pending += 1;
        trace!("Queued load of {}", path.display());

        self.pool.spawn(move || {
            let cached = cache.lock().get(&path).cloned();
            let result = match cached {
                Some(asset) => Ok(asset),
                None => source.load(&path).map(|asset| {
                    let asset = Arc::new(asset);
                    cache.lock().insert(path.clone(), Arc::clone(&asset));
                    asset
                }),
            };
            if sender.send(LoadResult { tag, path, result }).is_err() {
                debug!("Asset loader dropped before a load finished");
            }
        });
    }

    /// Returns every load finished so far without blocking.
    pub fn drain(&mut self) -> Vec<LoadResult<T>> {
        let done: Vec<_> = self.receiver.try_iter().collect();
        self.pending -= done.len();
        done
    }

    /// Blocks until every queued load has finished or `timeout` runs out.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<LoadResult<T>> {
        let deadline = Instant::now() + timeout;
        let mut done = Vec::new();
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(result) => {
                    self.pending -= 1;
                    done.push(result);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        done
    }

    /// Loads queued but not yet drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Loads finished and waiting for the next [`drain`](AssetLoader::drain).
    pub fn ready(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_cached(&self, path: &std::path::Path) -> bool {
        self.cache.lock().contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::models::tests::InMemorySource;
    use std::path::Path;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_loads_complete_with_their_tags() {
        let source = Arc::new(InMemorySource::default().with_model("obd.gltf"));
        let mut loader = AssetLoader::new(source, 2).unwrap();
        for tag in 0..4u32 {
            loader.request("obd.gltf", tag);
        }
        assert_eq!(loader.pending(), 4);

        let mut tags: Vec<u32> = loader
            .wait_idle(WAIT)
            .into_iter()
            .map(|done| {
                assert!(done.result.is_ok());
                done.tag
            })
            .collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![0, 1, 2, 3]);
        assert_eq!(loader.pending(), 0);
        assert!(loader.is_cached(Path::new("obd.gltf")));
    }

    #[test]
    fn test_failed_load_is_reported_and_not_cached() {
        let mut loader = AssetLoader::new(Arc::new(InMemorySource::default()), 1).unwrap();
        loader.request("missing.gltf", ());
        let done = loader.wait_idle(WAIT);
        assert_eq!(done.len(), 1);
        assert!(done[0].result.is_err());
        assert!(!loader.is_cached(Path::new("missing.gltf")));
    }

    #[test]
    fn test_cache_avoids_reloading() {
        let source = Arc::new(InMemorySource::default().with_model("obd.gltf"));
        let mut loader = AssetLoader::new(source.clone(), 1).unwrap();
        loader.request("obd.gltf", ());
        loader.wait_idle(WAIT);
        loader.request("obd.gltf", ());
        loader.wait_idle(WAIT);
        assert_eq!(*source.loads.lock(), 1);
    }

    #[test]
    fn test_drain_does_not_block() {
        let mut loader: AssetLoader<()> =
            AssetLoader::new(Arc::new(InMemorySource::default()), 1).unwrap();
        assert!(loader.drain().is_empty());
    }
}
