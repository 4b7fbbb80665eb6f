// Topic-based fan-out from the server to connected clients.

use super::types::{ClientId, ConnectionState, Outbound, ShipUpdate, Topic, WorldSnapshot};
use crate::domain::VesselState;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

/// Why a single delivery did not reach a client queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The client is not draining its queue; the message was dropped.
    QueueFull,
    /// The client's transport is gone; the client was disconnected.
    Closed,
}

/// Outcome of one fan-out. Failures are informational and never errors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failures: Vec<(ClientId, DeliveryFailure)>,
    // World subscribers without a registered own vessel.
    pub skipped: usize,
    // Ship update older than one already published for the same vessel.
    pub stale: bool,
}

/// Errors for subscription management on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    UnknownClient(ClientId),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::UnknownClient(id) => write!(f, "client {id} is not connected"),
        }
    }
}

impl std::error::Error for ChannelError {}

struct Subscriber {
    tx: mpsc::Sender<Outbound>,
    topics: BTreeSet<Topic>,
    // Vessel that world snapshots are scoped to.
    ship: Option<Arc<str>>,
}

#[derive(Default)]
struct Subscribers {
    next_id: ClientId,
    clients: BTreeMap<ClientId, Subscriber>,
    // Newest state sent per vessel, on either topic. Nothing older goes out after it.
    published: HashMap<Arc<str>, Arc<VesselState>>,
}

impl Subscribers {
    fn get_mut(&mut self, client: ClientId) -> Result<&mut Subscriber, ChannelError> {
        self.clients
            .get_mut(&client)
            .ok_or(ChannelError::UnknownClient(client))
    }

    // Replaces listed states that are older than one already sent and records the rest
    // as the newest, so a world snapshot never moves a vessel backwards.
    fn reconcile(&mut self, vessels: &[VesselState]) -> Vec<VesselState> {
        vessels
            .iter()
            .map(|listed| {
                let newer = self
                    .published
                    .get(&listed.name)
                    .filter(|sent| sent.revision > listed.revision)
                    .cloned();
                match newer {
                    Some(sent) => (*sent).clone(),
                    None => {
                        let listed = Arc::new(listed.clone());
                        self.published.insert(listed.name.clone(), listed.clone());
                        (*listed).clone()
                    }
                }
            })
            .collect()
    }

    fn prune(&mut self, report: &DeliveryReport) {
        for (client, failure) in &report.failures {
            if *failure == DeliveryFailure::Closed && self.clients.remove(client).is_some() {
                info!(client_id = client, "client transport closed; disconnected");
            }
        }
    }
}

/// Server-to-client update channel with explicit topics and per-connection queues.
pub struct UpdateChannel {
    queue_capacity: usize,
    subscribers: Mutex<Subscribers>,
}

impl UpdateChannel {
    /// Creates a channel whose per-client queues hold `queue_capacity` messages.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    /// Registers a new connection in the `Connected` state.
    pub async fn connect(&self) -> (ClientId, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut subs = self.subscribers.lock().await;
        subs.next_id += 1;
        let client = subs.next_id;
        subs.clients.insert(
            client,
            Subscriber {
                tx,
                topics: BTreeSet::new(),
                ship: None,
            },
        );
        debug!(client_id = client, "client connected to update channel");
        (client, rx)
    }

    /// Drops the client and all of its subscriptions. Returns false if it was already gone.
    pub async fn disconnect(&self, client: ClientId) -> bool {
        let removed = self.subscribers.lock().await.clients.remove(&client).is_some();
        if removed {
            debug!(client_id = client, "client disconnected from update channel");
        }
        removed
    }

    /// Binds the vessel a client's world snapshots are built around.
    pub async fn board(&self, client: ClientId, ship: Arc<str>) -> Result<(), ChannelError> {
        let mut subs = self.subscribers.lock().await;
        subs.get_mut(client)?.ship = Some(ship);
        Ok(())
    }

    /// Returns true if the topic was newly added.
    pub async fn subscribe(&self, client: ClientId, topic: Topic) -> Result<bool, ChannelError> {
        let mut subs = self.subscribers.lock().await;
        Ok(subs.get_mut(client)?.topics.insert(topic))
    }

    /// Returns true if the topic was held.
    pub async fn unsubscribe(&self, client: ClientId, topic: &Topic) -> Result<bool, ChannelError> {
        let mut subs = self.subscribers.lock().await;
        Ok(subs.get_mut(client)?.topics.remove(topic))
    }

    pub async fn state(&self, client: ClientId) -> ConnectionState {
        let subs = self.subscribers.lock().await;
        match subs.clients.get(&client) {
            None => ConnectionState::Disconnected,
            Some(sub) if sub.topics.is_empty() => ConnectionState::Connected,
            Some(sub) => ConnectionState::Subscribed(sub.topics.iter().cloned().collect()),
        }
    }

    pub async fn client_count(&self) -> usize {
        self.subscribers.lock().await.clients.len()
    }

    /// Sends every world subscriber a snapshot scoped to its own vessel.
    ///
    /// A listed vessel older than a state already sent for it is replaced by that state.
    pub async fn broadcast_world(&self, vessels: &[VesselState]) -> DeliveryReport {
        let mut subs = self.subscribers.lock().await;
        let mut report = DeliveryReport::default();
        let vessels = subs.reconcile(vessels);

        for (&client, sub) in &subs.clients {
            if !sub.topics.contains(&Topic::World) {
                continue;
            }
            let Some(own) = sub
                .ship
                .as_ref()
                .and_then(|ship| vessels.iter().find(|v| v.name == *ship))
            else {
                report.skipped += 1;
                continue;
            };

            let snapshot = WorldSnapshot {
                ship: own.clone(),
                other_ships: vessels
                    .iter()
                    .filter(|v| v.name != own.name)
                    .cloned()
                    .collect(),
            };
            deliver(client, sub, Outbound::World(snapshot), &mut report);
        }

        subs.prune(&report);
        report
    }

    /// Sends a vessel's new state to every client subscribed to that vessel.
    pub async fn publish_vessel_update(&self, update: ShipUpdate) -> DeliveryReport {
        let mut subs = self.subscribers.lock().await;
        let mut report = DeliveryReport::default();
        let vessel = update.vessel();

        // Drop updates that lost a race with a newer revision of the same vessel. An equal
        // revision is the same state and still goes out to ship subscribers.
        let last = subs.published.get(&vessel.name).map(|sent| sent.revision);
        if let Some(last) = last.filter(|&last| vessel.revision < last) {
            debug!(
                vessel = %vessel.name,
                revision = vessel.revision,
                last,
                "stale ship update dropped"
            );
            report.stale = true;
            return report;
        }
        subs.published.insert(vessel.name.clone(), update.0.clone());

        let topic = Topic::Ship(vessel.name.clone());
        for (&client, sub) in &subs.clients {
            if sub.topics.contains(&topic) {
                deliver(client, sub, Outbound::Ship(update.clone()), &mut report);
            }
        }

        subs.prune(&report);
        report
    }

    /// Drops the retained state of a vessel that left.
    pub async fn forget_vessel(&self, name: &str) {
        self.subscribers.lock().await.published.remove(name);
    }
}

fn deliver(client: ClientId, sub: &Subscriber, msg: Outbound, report: &mut DeliveryReport) {
    match sub.tx.try_send(msg) {
        Ok(()) => report.delivered += 1,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!(client_id = client, "client queue full; dropping update");
            report.failures.push((client, DeliveryFailure::QueueFull));
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            report.failures.push((client, DeliveryFailure::Closed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vec3;

    fn state(name: &str, revision: u64) -> VesselState {
        VesselState {
            name: Arc::from(name),
            heading: Vec3::REFERENCE,
            position: Vec3::ZERO,
            revision,
        }
    }

    fn fleet() -> Vec<VesselState> {
        ["Artemis", "Titanic", "Enterprise"]
            .into_iter()
            .map(|n| state(n, 0))
            .collect()
    }

    #[tokio::test]
    async fn lifecycle_moves_through_connected_subscribed_disconnected() {
        let channel = UpdateChannel::new(8);
        let (client, _rx) = channel.connect().await;
        assert_eq!(channel.state(client).await, ConnectionState::Connected);

        channel.subscribe(client, Topic::World).await.unwrap();
        channel
            .subscribe(client, Topic::Ship(Arc::from("Titanic")))
            .await
            .unwrap();
        assert_eq!(
            channel.state(client).await,
            ConnectionState::Subscribed(vec![Topic::World, Topic::Ship(Arc::from("Titanic"))])
        );

        assert!(channel.disconnect(client).await);
        assert_eq!(channel.state(client).await, ConnectionState::Disconnected);
        assert_eq!(
            channel.subscribe(client, Topic::World).await,
            Err(ChannelError::UnknownClient(client))
        );
    }

    #[tokio::test]
    async fn world_snapshot_is_scoped_to_own_vessel() {
        let channel = UpdateChannel::new(8);
        let (client, mut rx) = channel.connect().await;
        channel.board(client, Arc::from("Titanic")).await.unwrap();
        channel.subscribe(client, Topic::World).await.unwrap();

        let report = channel.broadcast_world(&fleet()).await;
        assert_eq!(report.delivered, 1);

        let Some(Outbound::World(snapshot)) = rx.recv().await else {
            panic!("expected world snapshot");
        };
        assert_eq!(&*snapshot.ship.name, "Titanic");
        let others: Vec<&str> = snapshot.other_ships.iter().map(|v| v.name.as_ref()).collect();
        assert_eq!(others, vec!["Artemis", "Enterprise"]);
    }

    #[tokio::test]
    async fn world_subscribers_without_registered_vessel_are_skipped() {
        let channel = UpdateChannel::new(8);
        let (unboarded, mut rx_a) = channel.connect().await;
        channel.subscribe(unboarded, Topic::World).await.unwrap();
        let (ghost, mut rx_b) = channel.connect().await;
        channel.board(ghost, Arc::from("Galactica")).await.unwrap();
        channel.subscribe(ghost, Topic::World).await.unwrap();

        let report = channel.broadcast_world(&fleet()).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.skipped, 2);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn ship_updates_reach_only_that_ships_subscribers() {
        let channel = UpdateChannel::new(8);
        let (watcher, mut rx_watcher) = channel.connect().await;
        channel
            .subscribe(watcher, Topic::Ship(Arc::from("Artemis")))
            .await
            .unwrap();
        let (other, mut rx_other) = channel.connect().await;
        channel
            .subscribe(other, Topic::Ship(Arc::from("Titanic")))
            .await
            .unwrap();

        let report = channel
            .publish_vessel_update(state("Artemis", 1).into())
            .await;
        assert_eq!(report.delivered, 1);
        assert!(matches!(rx_watcher.try_recv(), Ok(Outbound::Ship(u)) if &*u.vessel().name == "Artemis"));
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_transport_does_not_block_other_clients() {
        let channel = UpdateChannel::new(8);
        let topic = Topic::Ship(Arc::from("Enterprise"));
        let (client_a, rx_a) = channel.connect().await;
        let (client_b, mut rx_b) = channel.connect().await;
        channel.subscribe(client_a, topic.clone()).await.unwrap();
        channel.subscribe(client_b, topic).await.unwrap();

        // Client A's transport goes away mid-session.
        drop(rx_a);

        let report = channel
            .publish_vessel_update(state("Enterprise", 1).into())
            .await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures, vec![(client_a, DeliveryFailure::Closed)]);
        assert!(matches!(rx_b.try_recv(), Ok(Outbound::Ship(_))));
        assert_eq!(channel.state(client_a).await, ConnectionState::Disconnected);
        assert_eq!(channel.client_count().await, 1);
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_client_only() {
        let channel = UpdateChannel::new(1);
        let topic = Topic::Ship(Arc::from("Firefly"));
        let (slow, _rx_slow) = channel.connect().await;
        let (fast, mut rx_fast) = channel.connect().await;
        channel.subscribe(slow, topic.clone()).await.unwrap();
        channel.subscribe(fast, topic).await.unwrap();

        channel.publish_vessel_update(state("Firefly", 1).into()).await;
        assert!(rx_fast.try_recv().is_ok());

        let report = channel.publish_vessel_update(state("Firefly", 2).into()).await;
        assert_eq!(report.failures, vec![(slow, DeliveryFailure::QueueFull)]);
        assert!(matches!(rx_fast.try_recv(), Ok(Outbound::Ship(u)) if u.vessel().revision == 2));
        // A full queue is not a disconnect.
        assert_eq!(
            channel.state(slow).await,
            ConnectionState::Subscribed(vec![Topic::Ship(Arc::from("Firefly"))])
        );
    }

    #[tokio::test]
    async fn stale_revisions_are_not_delivered() {
        let channel = UpdateChannel::new(8);
        let (client, mut rx) = channel.connect().await;
        channel
            .subscribe(client, Topic::Ship(Arc::from("Artemis")))
            .await
            .unwrap();

        channel.publish_vessel_update(state("Artemis", 3).into()).await;
        let report = channel.publish_vessel_update(state("Artemis", 2).into()).await;
        assert!(report.stale);
        assert_eq!(report.delivered, 0);

        assert!(matches!(rx.try_recv(), Ok(Outbound::Ship(u)) if u.vessel().revision == 3));
        assert!(rx.try_recv().is_err());

        // Forgetting the vessel drops its retained state.
        channel.forget_vessel("Artemis").await;
        let report = channel.publish_vessel_update(state("Artemis", 1).into()).await;
        assert!(!report.stale);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn world_snapshot_listed_before_a_ship_update_does_not_rewind_it() {
        let channel = UpdateChannel::new(8);
        let (client, mut rx) = channel.connect().await;
        channel.board(client, Arc::from("Artemis")).await.unwrap();
        channel.subscribe(client, Topic::World).await.unwrap();
        channel
            .subscribe(client, Topic::Ship(Arc::from("Titanic")))
            .await
            .unwrap();

        // The roster was read, then Titanic turned around before the tick went out.
        let listed = fleet();
        let mut turned = state("Titanic", 2);
        turned.heading = Vec3::new(0.0, 0.0, -1.0);
        channel.publish_vessel_update(turned.into()).await;
        channel.broadcast_world(&listed).await;

        assert!(matches!(rx.try_recv(), Ok(Outbound::Ship(u)) if u.vessel().revision == 2));
        let Ok(Outbound::World(snapshot)) = rx.try_recv() else {
            panic!("expected world snapshot");
        };
        let titanic = snapshot
            .other_ships
            .iter()
            .find(|v| &*v.name == "Titanic")
            .expect("titanic listed");
        assert_eq!(titanic.revision, 2);
        assert_eq!(titanic.heading, Vec3::new(0.0, 0.0, -1.0));
    }

    #[tokio::test]
    async fn ship_update_older_than_a_broadcast_state_is_dropped() {
        let channel = UpdateChannel::new(8);
        let (client, mut rx) = channel.connect().await;
        channel.board(client, Arc::from("Artemis")).await.unwrap();
        channel.subscribe(client, Topic::World).await.unwrap();
        channel
            .subscribe(client, Topic::Ship(Arc::from("Titanic")))
            .await
            .unwrap();

        let mut listed = fleet();
        listed[1].revision = 5;
        channel.broadcast_world(&listed).await;
        assert!(matches!(rx.try_recv(), Ok(Outbound::World(_))));

        // A publish that lost the race with the tick is older than what the client saw.
        let report = channel.publish_vessel_update(state("Titanic", 4).into()).await;
        assert!(report.stale);
        assert!(rx.try_recv().is_err());

        // The same revision still reaches ship subscribers.
        let report = channel.publish_vessel_update(state("Titanic", 5).into()).await;
        assert!(!report.stale);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_deliveries() {
        let channel = UpdateChannel::new(8);
        let topic = Topic::Ship(Arc::from("Titanic"));
        let (client, mut rx) = channel.connect().await;
        channel.subscribe(client, topic.clone()).await.unwrap();
        assert_eq!(channel.unsubscribe(client, &topic).await, Ok(true));
        assert_eq!(channel.unsubscribe(client, &topic).await, Ok(false));

        channel.publish_vessel_update(state("Titanic", 1).into()).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(channel.state(client).await, ConnectionState::Connected);
    }
}
