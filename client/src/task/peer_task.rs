use std::{sync::Arc, time::Duration};

use log::{debug, info};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use kinesync_shared::{Clock, PeerId, ProbeReply, ProbeRequest, SyncConfig};

use crate::{
    connection::{Peer, PeerStatus, ResyncCoordinator},
    error::ClientError,
    events::{SyncEvent, SyncEvents},
};

/// Inputs a peer task accepts from the connection-lifecycle and transport
/// layers.
#[derive(Clone, Debug)]
pub enum PeerCommand {
    Connect,
    Disconnect,
    Reconfigure(SyncConfig),
    ProbeReply(ProbeReply),
}

/// Owner's side of a running peer task.
pub struct PeerTaskHandle {
    peer_id: PeerId,
    commands: mpsc::UnboundedSender<PeerCommand>,
    status: watch::Receiver<PeerStatus>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<PeerStatus>,
}

impl PeerTaskHandle {
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn send(&self, command: PeerCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::TaskStopped { peer: self.peer_id })
    }

    pub fn connect(&self) -> Result<(), ClientError> {
        self.send(PeerCommand::Connect)
    }

    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.send(PeerCommand::Disconnect)
    }

    pub fn deliver_reply(&self, reply: ProbeReply) -> Result<(), ClientError> {
        self.send(PeerCommand::ProbeReply(reply))
    }

    /// Latest published status. Never blocks the task.
    pub fn status(&self) -> PeerStatus {
        *self.status.borrow()
    }

    /// A receiver that is notified every time the task publishes.
    pub fn subscribe(&self) -> watch::Receiver<PeerStatus> {
        self.status.clone()
    }

    /// Events emitted by the task since the last call.
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Stop the task and wait for it, returning the final status. In-flight
    /// probes are discarded.
    pub async fn shutdown(mut self) -> Option<PeerStatus> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.join.await.ok()
    }
}

/// Run one peer's sampling and resync state machine on its own tokio task.
///
/// Every `poll_interval` the task expires overdue probes, advances the resync
/// window and emits a probe on `outbound` if one is due. Its status is
/// published through a watch channel after every step, so readers always see
/// a complete snapshot.
pub fn spawn_peer_task(
    peer_id: PeerId,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
    outbound: mpsc::UnboundedSender<ProbeRequest>,
    poll_interval: Duration,
) -> PeerTaskHandle {
    let peer = Peer::new(peer_id, &config);
    let (status_sender, status) = watch::channel(peer.status());
    let (commands, command_receiver) = mpsc::unbounded_channel();
    let (event_sender, events) = mpsc::unbounded_channel();
    let (shutdown, shutdown_receiver) = oneshot::channel();

    let task = PeerTask {
        peer,
        resync: ResyncCoordinator::new(&config),
        events: SyncEvents::new(),
        clock,
        outbound,
        status: status_sender,
        event_sender,
    };
    let join = tokio::spawn(task.run(command_receiver, shutdown_receiver, poll_interval));

    PeerTaskHandle {
        peer_id,
        commands,
        status,
        events,
        shutdown: Some(shutdown),
        join,
    }
}

struct PeerTask {
    peer: Peer,
    resync: ResyncCoordinator,
    events: SyncEvents,
    clock: Arc<dyn Clock>,
    outbound: mpsc::UnboundedSender<ProbeRequest>,
    status: watch::Sender<PeerStatus>,
    event_sender: mpsc::UnboundedSender<SyncEvent>,
}

impl PeerTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<PeerCommand>,
        mut shutdown: oneshot::Receiver<()>,
        poll_interval: Duration,
    ) -> PeerStatus {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = ticker.tick() => {
                    if !self.step() {
                        break;
                    }
                }
            }
            self.publish();
        }

        info!("{}: peer task stopping", self.peer.id());
        self.peer.sampler.stop();
        self.publish();
        self.peer.status()
    }

    fn handle(&mut self, command: PeerCommand) {
        let now = self.clock.now();
        match command {
            PeerCommand::Connect => self.resync.on_reconnect(&mut self.peer, &now, &mut self.events),
            PeerCommand::Disconnect => self.resync.on_disconnect(&mut self.peer, &mut self.events),
            PeerCommand::Reconfigure(config) => {
                self.resync.reconfigure(&config);
                self.peer.reconfigure(&config);
            }
            PeerCommand::ProbeReply(reply) => {
                if let Err(error) =
                    self.peer
                        .receive_reply(&reply, &now, &self.resync, &mut self.events)
                {
                    debug!("{}", error);
                }
            }
        }
    }

    /// Returns false once nobody is left to send probes for us.
    fn step(&mut self) -> bool {
        let now = self.clock.now();
        for error in self.peer.update(&now, &self.resync, &mut self.events) {
            debug!("{}", error);
        }
        match self.peer.poll_probe(&now) {
            Some(probe) => self.outbound.send(probe).is_ok(),
            None => true,
        }
    }

    fn publish(&mut self) {
        self.status.send_replace(self.peer.status());
        for event in self.events.take() {
            // the handle may have been dropped without shutting us down
            let _ = self.event_sender.send(event);
        }
    }
}
