use std::{future::Future, time::Duration};

use flannel_operator_core::{
    kubernetes::cluster::{ClusterOperations, KubeCluster},
    resources::release::OperatorRelease,
};
use futures::{Stream, StreamExt};
use kube::Client;
use log::{debug, error, info, warn};
use tokio::{pin, select};

use crate::{
    config::{create_client, OperatorConfig},
    error::OperatorError,
};

use self::{
    informer::NetworkEvent,
    queue::{NetworkAction, QueueSettings, RetryDecision, WorkKey, WorkQueue},
    reconciler::{
        context::ReconcilerContext,
        network::{on_add, on_delete, on_update},
    },
    registration::{deregister, register, wait_until_served, SERVED_POLL_INTERVAL},
    server::ensure_server_workload,
};

pub mod informer;
pub mod queue;
pub mod reconciler;
pub mod registration;
pub mod server;

pub const DEFAULT_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSettings {
    pub queue: QueueSettings,
    pub registration_timeout: Duration,
    /// skip removing the resource type on stop
    pub retain_resource_type: bool,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            queue: QueueSettings::default(),
            registration_timeout: DEFAULT_REGISTRATION_TIMEOUT,
            retain_resource_type: false,
        }
    }
}

pub struct Operator<C> {
    context: ReconcilerContext<C>,
    settings: OperatorSettings,
}

impl Operator<KubeCluster> {
    pub async fn connect(config: &OperatorConfig) -> Result<Self, OperatorError> {
        let client = create_client(&config.kube_config, &config.kube_context).await?;
        let cluster = KubeCluster::new(client).with_dry_run(config.dry_run);

        Ok(Self::new(cluster, config.release.clone()).with_settings(config.settings.clone()))
    }

    pub fn client(&self) -> &Client {
        self.context.cluster.client()
    }
}

impl<C: ClusterOperations> Operator<C> {
    pub fn new(cluster: C, release: OperatorRelease) -> Self {
        Self {
            context: ReconcilerContext::new(cluster, release),
            settings: OperatorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OperatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers the resource type, provisions the server and reconciles
    /// `events` until `shutdown` resolves, then calls [`Operator::stop`].
    ///
    /// Only a failed registration is fatal.
    pub async fn run(
        &self,
        events: impl Stream<Item = NetworkEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), OperatorError> {
        register(&self.context.cluster)
            .await
            .map_err(OperatorError::RegistrationError)?;

        wait_until_served(
            &self.context.cluster,
            self.settings.registration_timeout,
            SERVED_POLL_INTERVAL,
        )
        .await;

        if let Err(error) = ensure_server_workload(&self.context.cluster, &self.context.release).await {
            error!("Couldn't provision the flannel server, continuing without it! Reason: {error}");
        }

        info!("Operator started!");

        self.process(events, shutdown).await;
        self.stop().await
    }

    /// Best-effort teardown, failures are only logged.
    pub async fn stop(&self) -> Result<(), OperatorError> {
        if self.settings.retain_resource_type {
            info!("Leaving the FlannelNetwork resource type registered");
            return Ok(());
        }

        match self.context.cluster.count_networks().await {
            Ok(0) => {}
            Ok(count) => warn!(
                "Removing the FlannelNetwork resource type deletes {count} network(s), their client workloads will be left behind! Use --retain-resource-type to keep them"
            ),
            Err(error) => warn!("Couldn't count networks before deregistration! Reason: {error}"),
        }

        if let Err(error) = deregister(&self.context.cluster).await {
            warn!("Couldn't deregister the FlannelNetwork resource type! Reason: {error}");
        }

        Ok(())
    }

    async fn process(
        &self,
        events: impl Stream<Item = NetworkEvent>,
        shutdown: impl Future<Output = ()>,
    ) {
        let (mut queue, ready) = WorkQueue::new(self.settings.queue.clone());
        let mut events_open = true;

        pin!(events);
        pin!(ready);
        pin!(shutdown);

        loop {
            select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Shutting down with {} wanted network(s)", queue.wanted());
                    return;
                }
                Some(key) = ready.next() => self.handle(&mut queue, key).await,
                event = events.next(), if events_open => match event {
                    Some(event) => self.enqueue(&mut queue, event),
                    None => {
                        warn!("Network event stream ended, waiting for shutdown");
                        events_open = false;
                    }
                },
            }
        }
    }

    fn enqueue(&self, queue: &mut WorkQueue, event: NetworkEvent) {
        let action = match event {
            NetworkEvent::Added(network) => NetworkAction::Add(network),
            NetworkEvent::Deleted(network) => NetworkAction::Delete(network),
            NetworkEvent::Updated { old, new } => {
                match on_update(&old, &new) {
                    Ok(outcome) => debug!("Update of network ignored: {outcome:?}"),
                    Err(error) => warn!("{error}"),
                }
                return;
            }
        };

        if queue.push(action).is_none() {
            warn!("Ignoring a network without a name or namespace");
        }
    }

    async fn handle(&self, queue: &mut WorkQueue, key: WorkKey) {
        let result = match queue.resolve(&key) {
            NetworkAction::Add(network) => on_add(&self.context, &network).await,
            NetworkAction::Delete(network) => on_delete(&self.context, &network).await,
        };

        match result {
            Ok(outcome) => {
                queue.done(&key);
                debug!("Network {key} reconciled: {outcome:?}");
            }
            Err(error) if error.is_retryable() => match queue.retry(&key) {
                RetryDecision::Scheduled { attempt, delay } => warn!(
                    "Reconciling network {key} failed (attempt {attempt}), retrying in {}s! Reason: {error}",
                    delay.as_secs_f32()
                ),
                RetryDecision::GaveUp { attempts } => error!(
                    "Giving up on network {key} after {attempts} attempt(s)! Reason: {error}"
                ),
            },
            Err(error) => {
                queue.done(&key);
                error!("Reconciling network {key} failed! Reason: {error}");
            }
        }
    }
}
