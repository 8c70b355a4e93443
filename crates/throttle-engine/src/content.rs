//! Background loading of vehicle visuals.
//!
//! There is no renderer in the headless host, so "loading" a model means
//! looking up its measured bounds in the configured catalog on a worker
//! thread. Requests are queued over a channel and completed through the
//! [`VisualHandle`] the simulation holds; the simulation keeps using
//! placeholder sizes until then.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ahash::AHashMap;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use throttle_common::{BoundingSize, ContentResolver, VehicleKind, VisualHandle, VisualState};
use tracing::{debug, warn};

/// Why a visual failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The model is not in the catalog
    #[error("unknown model: {0}")]
    UnknownModel(String),
    /// The catalog entry has non-positive dimensions
    #[error("model {0} has invalid bounds")]
    InvalidBounds(String),
    /// The worker thread is gone
    #[error("content worker stopped")]
    WorkerStopped,
}

/// Content loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Simulated load time per model in milliseconds
    pub load_latency_ms: u64,
    /// Measured bounds per model file name
    pub catalog: BTreeMap<String, BoundingSize>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        let catalog = [
            ("car1_grey.glb", BoundingSize::new(1.9, 1.4, 4.3)),
            ("car2_blue.glb", BoundingSize::new(1.8, 1.5, 4.1)),
            ("car3_red.glb", BoundingSize::new(2.0, 1.6, 4.6)),
            ("car4_white.glb", BoundingSize::new(1.7, 1.4, 3.9)),
            ("police_car1.glb", BoundingSize::new(1.9, 1.6, 4.8)),
            ("truck1.glb", BoundingSize::new(2.5, 3.4, 9.6)),
            ("truck2.glb", BoundingSize::new(2.5, 3.2, 8.8)),
            ("bus1.glb", BoundingSize::new(2.5, 3.1, 11.0)),
            ("bus2.glb", BoundingSize::new(2.5, 3.3, 12.0)),
        ]
        .into_iter()
        .map(|(name, size)| (name.to_string(), size))
        .collect();

        Self {
            load_latency_ms: 15,
            catalog,
        }
    }
}

impl ContentConfig {
    /// Clamps values to usable ranges.
    pub fn validate(&mut self) {
        self.load_latency_ms = self.load_latency_ms.min(5_000);
    }
}

/// Result of one background load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Vehicle kind requested
    pub kind: VehicleKind,
    /// Model requested
    pub model: String,
    /// Measured bounds or the failure
    pub result: Result<BoundingSize, LoadError>,
}

struct LoadRequest {
    kind: VehicleKind,
    model: String,
    handle: VisualHandle,
}

/// Sizes learned from completed loads, per model.
type SizeCache = AHashMap<String, BoundingSize>;

/// [`ContentResolver`] backed by a worker thread.
pub struct ThreadedContentLoader {
    requests: Option<Sender<LoadRequest>>,
    outcomes: Receiver<LoadOutcome>,
    cache: Arc<RwLock<SizeCache>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadedContentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedContentLoader")
            .field("running", &self.requests.is_some())
            .field("cached_models", &self.cached_models())
            .finish_non_exhaustive()
    }
}

impl ThreadedContentLoader {
    /// Starts the worker thread.
    pub fn spawn(config: ContentConfig) -> std::io::Result<Self> {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (outcome_tx, outcome_rx) = unbounded::<LoadOutcome>();
        let cache = Arc::new(RwLock::new(SizeCache::default()));

        let worker_cache = Arc::clone(&cache);
        let worker = std::thread::Builder::new()
            .name("throttle-content".into())
            .spawn(move || run_worker(&config, &request_rx, &outcome_tx, &worker_cache))?;

        Ok(Self {
            requests: Some(request_tx),
            outcomes: outcome_rx,
            cache,
            worker: Some(worker),
        })
    }

    /// Collects loads finished since the last call.
    pub fn poll(&self) -> Vec<LoadOutcome> {
        self.outcomes.try_iter().collect()
    }

    /// Number of models with cached bounds.
    #[must_use]
    pub fn cached_models(&self) -> usize {
        self.cache.read().len()
    }

    /// Cached bounds for a model, if it has loaded.
    #[must_use]
    pub fn cached_size(&self, model: &str) -> Option<BoundingSize> {
        self.cache.read().get(model).copied()
    }

    /// Stops the worker and waits for it to exit. Queued requests are still served.
    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Content worker panicked");
            }
        }
    }
}

impl Drop for ThreadedContentLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ContentResolver for ThreadedContentLoader {
    fn resolve_bounding_size(&self, kind: VehicleKind, model: Option<&str>) -> BoundingSize {
        model
            .and_then(|name| self.cached_size(name))
            .unwrap_or_else(|| kind.placeholder_size())
    }

    fn load_visual(&self, kind: VehicleKind, model: Option<&str>) -> VisualHandle {
        let Some(model) = model else {
            return VisualHandle::placeholder(kind);
        };

        let handle = VisualHandle::pending(kind, Some(model.to_string()));
        if let Some(size) = self.cached_size(model) {
            handle.complete(VisualState::Ready(size));
            return handle;
        }

        let request = LoadRequest {
            kind,
            model: model.to_string(),
            handle: handle.clone(),
        };
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|requests| requests.send(request).is_ok());
        if !sent {
            warn!("{}: {model}", LoadError::WorkerStopped);
            handle.complete(VisualState::Failed);
        }
        handle
    }
}

fn run_worker(
    config: &ContentConfig,
    requests: &Receiver<LoadRequest>,
    outcomes: &Sender<LoadOutcome>,
    cache: &RwLock<SizeCache>,
) {
    let latency = Duration::from_millis(config.load_latency_ms);
    while let Ok(request) = requests.recv() {
        let cached = cache.read().get(&request.model).copied();
        let result = if let Some(size) = cached {
            Ok(size)
        } else {
            if !latency.is_zero() {
                std::thread::sleep(latency);
            }
            measure(config, &request.model)
        };

        match &result {
            Ok(size) => {
                cache.write().insert(request.model.clone(), *size);
                request.handle.complete(VisualState::Ready(*size));
                debug!("Loaded {} for {}: {:?}", request.model, request.kind, size);
            },
            Err(err) => {
                request.handle.complete(VisualState::Failed);
                debug!("Failed to load {} for {}: {err}", request.model, request.kind);
            },
        }

        let outcome = LoadOutcome {
            kind: request.kind,
            model: request.model,
            result,
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

fn measure(config: &ContentConfig, model: &str) -> Result<BoundingSize, LoadError> {
    let size = config
        .catalog
        .get(model)
        .copied()
        .ok_or_else(|| LoadError::UnknownModel(model.to_string()))?;
    if size.is_valid() {
        Ok(size)
    } else {
        Err(LoadError::InvalidBounds(model.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn instant_config() -> ContentConfig {
        ContentConfig {
            load_latency_ms: 0,
            ..Default::default()
        }
    }

    fn wait_for(handle: &VisualHandle) -> VisualState {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.state() == VisualState::Pending && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.state()
    }

    #[test]
    fn test_known_model_resolves() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        let handle = loader.load_visual(VehicleKind::Truck, Some("truck1.glb"));

        assert_eq!(
            wait_for(&handle),
            VisualState::Ready(BoundingSize::new(2.5, 3.4, 9.6))
        );
        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Truck, Some("truck1.glb")),
            BoundingSize::new(2.5, 3.4, 9.6)
        );
        assert_eq!(loader.cached_models(), 1);
    }

    #[test]
    fn test_sizes_are_resolved_per_model() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        wait_for(&loader.load_visual(VehicleKind::Car, Some("car1_grey.glb")));
        wait_for(&loader.load_visual(VehicleKind::Car, Some("car3_red.glb")));

        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Car, Some("car1_grey.glb")).length,
            4.3
        );
        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Car, Some("car3_red.glb")).length,
            4.6
        );
        // Loaded models of the same kind never stand in for one that has not loaded.
        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Car, Some("car2_blue.glb")),
            VehicleKind::Car.placeholder_size()
        );
        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Car, None),
            VehicleKind::Car.placeholder_size()
        );
    }

    #[test]
    fn test_unknown_model_fails_with_placeholder() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        let handle = loader.load_visual(VehicleKind::Car, Some("spaceship.glb"));

        assert_eq!(wait_for(&handle), VisualState::Failed);
        assert_eq!(handle.effective_size(), VehicleKind::Car.placeholder_size());
        assert_eq!(
            loader.resolve_bounding_size(VehicleKind::Car, Some("spaceship.glb")),
            VehicleKind::Car.placeholder_size()
        );
    }

    #[test]
    fn test_outcomes_are_reported() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        let handle = loader.load_visual(VehicleKind::Car, Some("nope.glb"));
        wait_for(&handle);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outcomes = Vec::new();
        while outcomes.is_empty() && Instant::now() < deadline {
            outcomes = loader.poll();
        }
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].result,
            Err(LoadError::UnknownModel("nope.glb".into()))
        );
    }

    #[test]
    fn test_cached_model_is_immediate() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        wait_for(&loader.load_visual(VehicleKind::Car, Some("car2_blue.glb")));

        let again = loader.load_visual(VehicleKind::Car, Some("car2_blue.glb"));
        assert!(matches!(again.state(), VisualState::Ready(_)));
    }

    #[test]
    fn test_no_model_gets_placeholder() {
        let loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        let handle = loader.load_visual(VehicleKind::Car, None);
        assert_eq!(
            handle.state(),
            VisualState::Ready(VehicleKind::Car.placeholder_size())
        );
    }

    #[test]
    fn test_stopped_worker_fails_requests() {
        let mut loader = ThreadedContentLoader::spawn(instant_config()).expect("spawn worker");
        loader.shutdown();
        let handle = loader.load_visual(VehicleKind::Truck, Some("bus1.glb"));
        assert_eq!(handle.state(), VisualState::Failed);
    }
}
