use std::{collections::HashSet, time::Duration};

use flannel_operator_core::resources::crd::v1alpha1::flannel_network::FlannelNetwork;
use futures::{Stream, StreamExt};
use kube::{
    runtime::{
        reflector::{self, store::Writer, ObjectRef, Store},
        watcher, WatchStreamExt,
    },
    Api,
};
use log::{debug, info, warn};
use tokio::{
    pin, select,
    sync::mpsc::UnboundedSender,
    time::{interval_at, Instant, MissedTickBehavior},
};

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Added(FlannelNetwork),
    Updated {
        old: FlannelNetwork,
        new: FlannelNetwork,
    },
    Deleted(FlannelNetwork),
}

/// Last accepted state of every network, used to turn raw watch events into
/// add/update/delete notifications.
///
/// A network whose spec changed keeps its accepted version, so resyncs and
/// the eventual delete keep referring to the workload that was created for
/// it.
pub struct InformerCache {
    writer: Writer<FlannelNetwork>,
    store: Store<FlannelNetwork>,
}

impl Default for InformerCache {
    fn default() -> Self {
        let (store, writer) = reflector::store();

        Self { writer, store }
    }
}

impl InformerCache {
    pub fn len(&self) -> usize {
        self.store.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The accepted version of a network, if it's known at all.
    pub fn get(&self, network: &FlannelNetwork) -> Option<FlannelNetwork> {
        self.store
            .get(&ObjectRef::from_obj(network))
            .map(|accepted| accepted.as_ref().clone())
    }

    pub fn apply(&mut self, event: watcher::Event<FlannelNetwork>) -> Vec<NetworkEvent> {
        match event {
            watcher::Event::Applied(network) => match self.get(&network) {
                None => {
                    self.accept(&network);
                    vec![NetworkEvent::Added(network)]
                }
                Some(old) if old.metadata.resource_version == network.metadata.resource_version => {
                    Vec::new()
                }
                Some(old) => {
                    if old.spec == network.spec {
                        self.accept(&network);
                    }

                    vec![NetworkEvent::Updated { old, new: network }]
                }
            },
            watcher::Event::Deleted(network) => {
                let accepted = self.get(&network).unwrap_or_else(|| network.clone());

                self.writer
                    .apply_watcher_event(&watcher::Event::Deleted(network));

                vec![NetworkEvent::Deleted(accepted)]
            }
            watcher::Event::Restarted(networks) => self.replace(networks),
        }
    }

    /// Re-announces every accepted network as added.
    pub fn resync(&self) -> Vec<NetworkEvent> {
        self.store
            .state()
            .into_iter()
            .map(|network| NetworkEvent::Added(network.as_ref().clone()))
            .collect()
    }

    fn accept(&mut self, network: &FlannelNetwork) {
        self.writer
            .apply_watcher_event(&watcher::Event::Applied(network.clone()));
    }

    fn replace(&mut self, networks: Vec<FlannelNetwork>) -> Vec<NetworkEvent> {
        let listed = networks
            .iter()
            .map(ObjectRef::from_obj)
            .collect::<HashSet<_>>();
        let mut events = Vec::with_capacity(networks.len());
        let mut accepted = Vec::with_capacity(networks.len());

        for network in networks {
            match self.get(&network) {
                Some(old) if old.spec != network.spec => {
                    events.push(NetworkEvent::Updated {
                        old: old.clone(),
                        new: network,
                    });
                    accepted.push(old);
                }
                _ => {
                    events.push(NetworkEvent::Added(network.clone()));
                    accepted.push(network);
                }
            }
        }

        events.extend(
            self.store
                .state()
                .into_iter()
                .filter(|known| !listed.contains(&ObjectRef::from_obj(known.as_ref())))
                .map(|gone| NetworkEvent::Deleted(gone.as_ref().clone())),
        );

        self.writer
            .apply_watcher_event(&watcher::Event::Restarted(accepted));

        events
    }
}

/// Watches `FlannelNetwork` objects cluster-wide and forwards the resulting
/// events until the receiving side goes away.
pub async fn run_informer(
    api: Api<FlannelNetwork>,
    resync_period: Duration,
    events: UnboundedSender<NetworkEvent>,
) {
    info!("Starting FlannelNetwork informer...");

    let watch = watcher(api, watcher::Config::default()).default_backoff();

    forward_events(watch, resync_period, events).await
}

/// Runs watch events through an [`InformerCache`] and forwards what comes
/// out, re-announcing every accepted network once per `resync_period`.
pub async fn forward_events(
    watch: impl Stream<Item = Result<watcher::Event<FlannelNetwork>, watcher::Error>>,
    resync_period: Duration,
    events: UnboundedSender<NetworkEvent>,
) {
    let mut cache = InformerCache::default();
    let mut resync = interval_at(Instant::now() + resync_period, resync_period);

    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    pin!(watch);

    loop {
        let batch = select! {
            event = watch.next() => match event {
                Some(Ok(event)) => cache.apply(event),
                Some(Err(error)) => {
                    warn!("FlannelNetwork watch failed: {error}");
                    continue;
                }
                None => {
                    warn!("FlannelNetwork watch ended");
                    return;
                }
            },
            _ = resync.tick() => {
                if cache.is_empty() {
                    continue;
                }

                debug!("Resyncing {} network(s)", cache.len());
                cache.resync()
            }
        };

        for event in batch {
            if events.send(event).is_err() {
                debug!("Event receiver is gone, stopping informer");
                return;
            }
        }
    }
}
