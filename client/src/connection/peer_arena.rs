use std::collections::{hash_map::Entry, HashMap};

use log::debug;

use kinesync_shared::{GameInstant, PeerId, ProbeReply, ProbeRequest, SyncConfig, SyncError};

use crate::{
    connection::{
        peer::{Peer, PeerStatus},
        resync_coordinator::ResyncCoordinator,
    },
    events::SyncEvents,
};

/// Every known peer, indexed by id, plus the coordinator that moves them
/// through connection loss and recovery.
pub struct PeerArena {
    config: SyncConfig,
    resync: ResyncCoordinator,
    peers: HashMap<PeerId, Peer>,
}

impl PeerArena {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config: config.clone(),
            resync: ResyncCoordinator::new(config),
            peers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&Peer> {
        self.peers.get(peer_id)
    }

    pub fn status(&self, peer_id: &PeerId) -> Option<PeerStatus> {
        self.peers.get(peer_id).map(Peer::status)
    }

    pub fn statuses(&self) -> HashMap<PeerId, PeerStatus> {
        self.peers
            .iter()
            .map(|(peer_id, peer)| (*peer_id, peer.status()))
            .collect()
    }

    /// Register the peer if needed, then start a resync for it.
    pub fn connect(&mut self, peer_id: PeerId, now: &GameInstant, events: &mut SyncEvents) {
        let peer = match self.peers.entry(peer_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("registering {}", peer_id);
                entry.insert(Peer::new(peer_id, &self.config))
            }
        };
        self.resync.on_reconnect(peer, now, events);
    }

    pub fn disconnect(&mut self, peer_id: &PeerId, events: &mut SyncEvents) -> Result<(), SyncError> {
        let peer = self
            .peers
            .get_mut(peer_id)
            .ok_or(SyncError::UnknownPeer { peer: *peer_id })?;
        self.resync.on_disconnect(peer, events);
        Ok(())
    }

    /// Forget the peer entirely.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Peer> {
        self.peers.remove(peer_id)
    }

    pub fn poll_probes(&mut self, now: &GameInstant) -> Vec<ProbeRequest> {
        self.peers
            .values_mut()
            .filter_map(|peer| peer.poll_probe(now))
            .collect()
    }

    pub fn receive_reply(
        &mut self,
        reply: &ProbeReply,
        now: &GameInstant,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let peer = self
            .peers
            .get_mut(&reply.peer_id)
            .ok_or(SyncError::UnknownPeer {
                peer: reply.peer_id,
            })?;
        peer.receive_reply(reply, now, &self.resync, events)
    }

    pub fn update(&mut self, now: &GameInstant, events: &mut SyncEvents) -> Vec<SyncError> {
        let mut errors = Vec::new();
        for peer in self.peers.values_mut() {
            errors.extend(peer.update(now, &self.resync, events));
        }
        errors
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.config = config.clone();
        self.resync.reconfigure(config);
        for peer in self.peers.values_mut() {
            peer.reconfigure(config);
        }
    }
}
