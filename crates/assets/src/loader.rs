use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::decode::{DecodedImage, ImageDecoder, JsonModelDecoder, ModelData, ModelDecoder};
use crate::resolver::{AssetResolver, Resolution};
use crate::{AssetId, normalize_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed,
}

/// Loader configuration: per-tick budget and how long a pending asset may stay pending.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of queued requests examined per tick.
    pub budget: usize,
    /// Ticks an asset may answer `Pending` before it is failed.
    pub timeout_ticks: u32,
    /// Tileset letter passed to the resolver as a lookup hint.
    pub tileset: char,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            budget: 64,
            timeout_ticks: 600,
            tileset: 'L',
        }
    }
}

/// Shared "still wanted" flag. Cleared once on teardown; every request keeps a clone.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    pub fn kill(&self) {
        self.0.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a request, reported once by `AssetLoader::poll`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Loaded {
        id: AssetId,
        path: String,
        kind: AssetKind,
    },
    Failed {
        id: AssetId,
        path: String,
        reason: String,
        /// Non-critical failures are kept out of user-facing notifications.
        critical: bool,
    },
}

impl LoadEvent {
    pub fn id(&self) -> AssetId {
        match self {
            LoadEvent::Loaded { id, .. } | LoadEvent::Failed { id, .. } => *id,
        }
    }
}

enum Slot {
    Pending,
    Image(DecodedImage),
    Model(ModelData),
    Failed(String),
}

struct Request {
    path: String,
    kind: AssetKind,
    critical: bool,
    waited: u32,
    liveness: Liveness,
    slot: Slot,
}

/// Per-tick statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub loaded_this_tick: usize,
    pub failed_this_tick: usize,
    pub still_pending: usize,
}

/// Polled, budgeted asset loader.
///
/// `request` only enqueues. Each `poll` examines at most `budget` queued requests,
/// so a completion is never observed on the tick that asked for it.
pub struct AssetLoader {
    config: LoaderConfig,
    resolver: Box<dyn AssetResolver>,
    images: ImageDecoder,
    models: Box<dyn ModelDecoder>,
    requests: HashMap<AssetId, Request>,
    queue: VecDeque<AssetId>,
    liveness: Liveness,
    stats: LoaderStats,
}

impl AssetLoader {
    pub fn new(config: LoaderConfig, resolver: Box<dyn AssetResolver>) -> Self {
        Self::with_model_decoder(config, resolver, Box::new(JsonModelDecoder))
    }

    pub fn with_model_decoder(
        config: LoaderConfig,
        resolver: Box<dyn AssetResolver>,
        models: Box<dyn ModelDecoder>,
    ) -> Self {
        Self {
            config,
            resolver,
            images: ImageDecoder,
            models,
            requests: HashMap::new(),
            queue: VecDeque::new(),
            liveness: Liveness::new(),
            stats: LoaderStats::default(),
        }
    }

    /// Ask for an asset. Repeated requests for the same path return the same id and
    /// never queue twice; a critical re-request upgrades the original.
    pub fn request(&mut self, path: &str, kind: AssetKind, critical: bool) -> AssetId {
        let id = AssetId::for_path(path);
        if let Some(existing) = self.requests.get_mut(&id) {
            existing.critical |= critical;
            return id;
        }
        if !self.liveness.is_alive() {
            tracing::debug!(path, "request after shutdown ignored");
            return id;
        }
        tracing::trace!(path, ?kind, critical, "asset requested");
        self.requests.insert(
            id,
            Request {
                path: normalize_path(path),
                kind,
                critical,
                waited: 0,
                liveness: self.liveness.clone(),
                slot: Slot::Pending,
            },
        );
        self.queue.push_back(id);
        id
    }

    /// Advance queued requests, returning what finished this tick.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let _span = tracing::info_span!("asset_poll").entered();
        let mut events = Vec::new();
        let mut deferred = Vec::new();
        let budget = self.config.budget.min(self.queue.len());

        for _ in 0..budget {
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            let Some(request) = self.requests.get_mut(&id) else {
                continue;
            };
            let resolution = self.resolver.resolve(&request.path, self.config.tileset);
            if !request.liveness.is_alive() {
                continue;
            }
            let outcome = match resolution {
                Resolution::Ready(asset) => match request.kind {
                    AssetKind::Image => self.images.decode(&asset).map(Slot::Image),
                    AssetKind::Model => self.models.decode(&asset).map(Slot::Model),
                }
                .map_err(|e| e.to_string()),
                Resolution::Pending => {
                    request.waited += 1;
                    if request.waited < self.config.timeout_ticks {
                        deferred.push(id);
                        continue;
                    }
                    Err(format!("still pending after {} ticks", request.waited))
                }
                Resolution::Missing => Err("not found".to_string()),
            };

            match outcome {
                Ok(slot) => {
                    tracing::debug!(path = %request.path, "asset loaded");
                    request.slot = slot;
                    events.push(LoadEvent::Loaded {
                        id,
                        path: request.path.clone(),
                        kind: request.kind,
                    });
                }
                Err(reason) => {
                    if request.critical {
                        tracing::error!(path = %request.path, %reason, "asset failed");
                    } else {
                        tracing::debug!(path = %request.path, %reason, "optional asset failed");
                    }
                    request.slot = Slot::Failed(reason.clone());
                    events.push(LoadEvent::Failed {
                        id,
                        path: request.path.clone(),
                        reason,
                        critical: request.critical,
                    });
                }
            }
        }
        self.queue.extend(deferred);

        self.stats = LoaderStats {
            loaded_this_tick: events.iter().filter(|e| matches!(e, LoadEvent::Loaded { .. })).count(),
            failed_this_tick: events.iter().filter(|e| matches!(e, LoadEvent::Failed { .. })).count(),
            still_pending: self.queue.len(),
        };
        events
    }

    pub fn state(&self, id: AssetId) -> Option<LoadState> {
        self.requests.get(&id).map(|r| match r.slot {
            Slot::Pending => LoadState::Pending,
            Slot::Failed(_) => LoadState::Failed,
            Slot::Image(_) | Slot::Model(_) => LoadState::Ready,
        })
    }

    pub fn image(&self, id: AssetId) -> Option<&DecodedImage> {
        match &self.requests.get(&id)?.slot {
            Slot::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn model(&self, id: AssetId) -> Option<&ModelData> {
        match &self.requests.get(&id)?.slot {
            Slot::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn failure(&self, id: AssetId) -> Option<&str> {
        match &self.requests.get(&id)?.slot {
            Slot::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn path(&self, id: AssetId) -> Option<&str> {
        self.requests.get(&id).map(|r| r.path.as_str())
    }

    /// Any request still waiting to resolve.
    pub fn is_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Stop loading. Queued work is dropped and later polls deliver nothing.
    pub fn shutdown(&mut self) {
        tracing::debug!(dropped = self.queue.len(), "asset loader shut down");
        self.liveness.kill();
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryResolver;

    const MODEL: &[u8] = br#"{"sequences": [{"name": "Stand"}]}"#;

    fn loader(resolver: MemoryResolver, budget: usize, timeout_ticks: u32) -> AssetLoader {
        let config = LoaderConfig {
            budget,
            timeout_ticks,
            ..LoaderConfig::default()
        };
        AssetLoader::new(config, Box::new(resolver))
    }

    #[test]
    fn completion_follows_request() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("a.mdx", MODEL.to_vec());
        let mut loader = loader(resolver, 8, 10);
        let id = loader.request("a.mdx", AssetKind::Model, true);
        assert_eq!(loader.state(id), Some(LoadState::Pending));
        let events = loader.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LoadEvent::Loaded { path, .. } if path == "a.mdx"));
        assert_eq!(loader.state(id), Some(LoadState::Ready));
        assert_eq!(loader.model(id).unwrap().sequences[0].name, "Stand");
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn duplicate_requests_share_an_id() {
        let mut loader = loader(MemoryResolver::new(), 8, 10);
        let a = loader.request("x\\y.mdl", AssetKind::Model, false);
        let b = loader.request("X/Y.mdx", AssetKind::Model, true);
        assert_eq!(a, b);
        assert_eq!(loader.pending_count(), 1);
        match &loader.poll()[0] {
            LoadEvent::Failed { critical, reason, .. } => {
                assert!(*critical);
                assert_eq!(reason, "not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn budget_limits_work_per_tick() {
        let mut resolver = MemoryResolver::new();
        for name in ["a.mdx", "b.mdx", "c.mdx"] {
            resolver.insert(name, MODEL.to_vec());
        }
        let mut loader = loader(resolver, 2, 10);
        for name in ["a.mdx", "b.mdx", "c.mdx"] {
            loader.request(name, AssetKind::Model, true);
        }
        assert_eq!(loader.poll().len(), 2);
        assert_eq!(loader.stats().still_pending, 1);
        assert_eq!(loader.poll().len(), 1);
        assert!(!loader.is_pending());
    }

    #[test]
    fn pending_assets_time_out() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_delayed("slow.mdx", MODEL.to_vec(), 100);
        let mut loader = loader(resolver, 8, 3);
        let id = loader.request("slow.mdx", AssetKind::Model, false);
        assert!(loader.poll().is_empty());
        assert!(loader.poll().is_empty());
        let events = loader.poll();
        assert!(matches!(&events[0], LoadEvent::Failed { critical: false, .. }));
        assert_eq!(loader.state(id), Some(LoadState::Failed));
        assert!(loader.failure(id).unwrap().contains("pending"));
    }

    #[test]
    fn delayed_asset_arrives_later() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_delayed("slow.mdx", MODEL.to_vec(), 2);
        let mut loader = loader(resolver, 8, 10);
        let id = loader.request("slow.mdx", AssetKind::Model, true);
        assert!(loader.poll().is_empty());
        assert!(loader.poll().is_empty());
        assert_eq!(loader.poll().len(), 1);
        assert_eq!(loader.state(id), Some(LoadState::Ready));
    }

    #[test]
    fn shutdown_drops_late_completions() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_delayed("slow.mdx", MODEL.to_vec(), 1);
        let mut loader = loader(resolver, 8, 10);
        let id = loader.request("slow.mdx", AssetKind::Model, true);
        let liveness = loader.liveness();
        assert!(loader.poll().is_empty());
        loader.shutdown();
        assert!(!liveness.is_alive());
        assert!(loader.poll().is_empty());
        assert_eq!(loader.state(id), Some(LoadState::Pending));
        loader.request("other.mdx", AssetKind::Model, true);
        assert!(!loader.is_pending());
    }

    #[test]
    fn image_decode_failure_is_reported() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("t.png", vec![0, 1, 2]);
        let mut loader = loader(resolver, 8, 10);
        let id = loader.request("t.png", AssetKind::Image, false);
        assert!(matches!(&loader.poll()[0], LoadEvent::Failed { .. }));
        assert!(loader.image(id).is_none());
    }
}
