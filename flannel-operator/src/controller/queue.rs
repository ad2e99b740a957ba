//! Deduplicating, rate-limited work queue in front of the reconciler.
//!
//! Keys are derived from the identity a client workload is named after and
//! go through kube-runtime's scheduler, which collapses repeated requests for
//! the same key. A key only turns into an action when it comes out of the
//! queue: it resolves to an add while its network is still wanted and to a
//! delete otherwise, so the newest event always wins. Failed keys are
//! rescheduled with exponential backoff until they run out of attempts.

use std::{collections::HashMap, time::Duration};

use flannel_operator_core::resources::crd::v1alpha1::flannel_network::{
    FlannelNetwork, FlannelNetworkSpec,
};
use futures::Stream;
use kube::{
    core::ObjectMeta,
    runtime::{
        reflector::{self, store::Writer, ObjectRef, Store},
        scheduler::{scheduler, ScheduleRequest},
        watcher,
    },
};
use log::debug;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    time::Instant,
};
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub max_attempts: u32,
    /// shortest time between two keys leaving the queue
    pub min_interval: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl QueueSettings {
    /// Delay before the given (1-based) retry.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));

        self.retry_base_delay
            .checked_mul(factor)
            .unwrap_or(self.retry_max_delay)
            .min(self.retry_max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkKey {
    pub namespace: String,
    pub name: String,
    pub vni: String,
}

impl WorkKey {
    pub fn for_network(network: &FlannelNetwork) -> Option<Self> {
        Some(Self {
            namespace: network.metadata.namespace.clone()?,
            name: network.metadata.name.clone()?,
            vni: network.spec.vni.clone(),
        })
    }

    pub fn object_ref(&self) -> ObjectRef<FlannelNetwork> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }

    /// A network carrying just enough to recompute the workload name, used
    /// for keys whose network is gone.
    pub fn to_network(&self) -> FlannelNetwork {
        FlannelNetwork {
            metadata: ObjectMeta {
                name: Some(self.name.to_owned()),
                namespace: Some(self.namespace.to_owned()),
                ..Default::default()
            },
            spec: FlannelNetworkSpec {
                vni: self.vni.to_owned(),
                cidr: String::new(),
            },
            status: None,
        }
    }
}

impl std::fmt::Display for WorkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} (VNI {})", self.namespace, self.name, self.vni)
    }
}

#[derive(Debug, Clone)]
pub enum NetworkAction {
    Add(FlannelNetwork),
    Delete(FlannelNetwork),
}

impl NetworkAction {
    pub fn network(&self) -> &FlannelNetwork {
        match self {
            NetworkAction::Add(network) | NetworkAction::Delete(network) => network,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Scheduled { attempt: u32, delay: Duration },
    GaveUp { attempts: u32 },
}

pub struct WorkQueue {
    settings: QueueSettings,
    wanted: Writer<FlannelNetwork>,
    store: Store<FlannelNetwork>,
    requests: UnboundedSender<ScheduleRequest<WorkKey>>,
    /// failed runs of keys that haven't succeeded yet
    failures: HashMap<WorkKey, u32>,
}

impl WorkQueue {
    /// Creates a queue together with the stream its keys come out of.
    ///
    /// The stream never ends while the queue is alive.
    pub fn new(settings: QueueSettings) -> (Self, impl Stream<Item = WorkKey>) {
        let (requests, receiver) = unbounded_channel();
        let ready = tokio_stream::StreamExt::throttle(
            scheduler(UnboundedReceiverStream::new(receiver)),
            settings.min_interval,
        );
        let (store, wanted) = reflector::store();

        (
            Self {
                settings,
                wanted,
                store,
                requests,
                failures: HashMap::new(),
            },
            ready,
        )
    }

    /// Number of networks whose client workload should exist.
    pub fn wanted(&self) -> usize {
        self.store.state().len()
    }

    /// Records a fresh action and schedules its key right away, clearing any
    /// failure history the key had.
    pub fn push(&mut self, action: NetworkAction) -> Option<WorkKey> {
        let key = WorkKey::for_network(action.network())?;

        match action {
            NetworkAction::Add(network) => {
                self.wanted
                    .apply_watcher_event(&watcher::Event::Applied(network));
            }
            NetworkAction::Delete(network) => {
                // a newer network with the same name may have taken its place
                if self.wanted_network(&key).is_some() {
                    self.wanted
                        .apply_watcher_event(&watcher::Event::Deleted(network));
                }
            }
        }

        self.failures.remove(&key);
        self.schedule(key.clone(), Instant::now());

        Some(key)
    }

    /// What a key leaving the queue currently asks for.
    pub fn resolve(&self, key: &WorkKey) -> NetworkAction {
        match self.wanted_network(key) {
            Some(network) => NetworkAction::Add(network),
            None => NetworkAction::Delete(key.to_network()),
        }
    }

    /// Schedules a failed key again with backoff, unless it's out of
    /// attempts.
    pub fn retry(&mut self, key: &WorkKey) -> RetryDecision {
        let attempts = {
            let failures = self.failures.entry(key.clone()).or_default();
            *failures += 1;
            *failures
        };

        if attempts >= self.settings.max_attempts {
            self.failures.remove(key);
            return RetryDecision::GaveUp { attempts };
        }

        let delay = self.settings.backoff(attempts);
        self.schedule(key.clone(), Instant::now() + delay);

        RetryDecision::Scheduled {
            attempt: attempts,
            delay,
        }
    }

    /// Forgets the failure history of a key that has been handled.
    pub fn done(&mut self, key: &WorkKey) {
        self.failures.remove(key);
    }

    fn wanted_network(&self, key: &WorkKey) -> Option<FlannelNetwork> {
        self.store
            .get(&key.object_ref())
            .filter(|network| network.spec.vni == key.vni)
            .map(|network| network.as_ref().clone())
    }

    fn schedule(&self, key: WorkKey, run_at: Instant) {
        let request = ScheduleRequest {
            message: key,
            run_at,
        };

        if let Err(error) = self.requests.send(request) {
            debug!("Work queue is closed, dropping {}", error.0.message);
        }
    }
}
