//! End-to-end registration over the loopback network.
//!
//! Every test drives real controllers; the only shortcut is that all peers
//! are pumped from the test thread instead of running as separate processes.

use std::time::Instant;

use bytes::Bytes;
use session::messages::SessionMessage;
use session::prelude::*;
use session::transport::LoopbackTransport;
use session::TransportEvent;
use test_log::test;

const PORT: u16 = 4546;

fn config_for(name: &str, max_players: usize) -> SessionConfig {
    SessionConfig {
        max_players,
        client_player: PlayerProfile::new(name, PlayerColor::rgb(name.len() as u8, 0, 0)),
        ..SessionConfig::default()
    }
}

struct Lobby {
    network: LoopbackNetwork,
    host: SessionController<LoopbackTransport>,
    clients: Vec<SessionController<LoopbackTransport>>,
}

impl Lobby {
    fn hosting() -> Self {
        let network = LoopbackNetwork::new();
        let mut host = SessionController::new(network.endpoint(), config_for("Host", 8));
        host.create_server().unwrap();
        Self {
            network,
            host,
            clients: Vec::new(),
        }
    }

    fn join(&mut self, name: &str) -> usize {
        let mut client = SessionController::new(self.network.endpoint(), config_for(name, 8));
        client.join_server("127.0.0.1", PORT).unwrap();
        self.clients.push(client);
        self.settle();
        self.clients.len() - 1
    }

    /// Pumps every peer until a full round delivers nothing new.
    fn settle(&mut self) {
        let now = Instant::now();
        for _ in 0..16 {
            self.host.update(now);
            for client in &mut self.clients {
                client.update(now);
            }
        }
    }

    fn registry_of(&self, index: usize) -> &Registry {
        self.clients[index].players().unwrap()
    }
}

fn snapshot(registry: &Registry) -> Vec<PlayerRecord> {
    registry.all().cloned().collect()
}

#[test]
fn scenario_server_then_x_then_y() {
    let mut lobby = Lobby::hosting();
    let host_ids: Vec<i32> = lobby.host.players().unwrap().ids().map(PeerId::get).collect();
    assert_eq!(host_ids, vec![1]);

    let x = lobby.join("X");
    let x_registry = lobby.registry_of(x);
    assert_eq!(x_registry.ids().map(PeerId::get).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(x_registry.get(PeerId::SERVER).unwrap().name, "ServerPlayer");
    assert_eq!(x_registry.get(PeerId::new(2)).unwrap().name, "X");

    let y = lobby.join("Y");

    let expected = vec![
        PlayerRecord::new(PeerId::SERVER, "ServerPlayer", PlayerColor::default()),
        PlayerRecord::new(PeerId::new(2), "X", PlayerColor::rgb(1, 0, 0)),
        PlayerRecord::new(PeerId::new(3), "Y", PlayerColor::rgb(1, 0, 0)),
    ];
    assert_eq!(snapshot(lobby.host.players().unwrap()), expected);
    assert_eq!(snapshot(lobby.registry_of(x)), expected);
    assert_eq!(snapshot(lobby.registry_of(y)), expected);
}

#[test]
fn every_peer_converges() {
    let mut lobby = Lobby::hosting();
    for name in ["Ada", "Brook", "Cy", "Dee", "Eli"] {
        lobby.join(name);
    }

    let reference = snapshot(lobby.host.players().unwrap());
    assert_eq!(reference.len(), 6);
    for (index, client) in lobby.clients.iter().enumerate() {
        assert_eq!(client.state(), SessionState::Joined);
        assert!(client.session().unwrap().is_registered());
        assert_eq!(snapshot(lobby.registry_of(index)), reference, "client {index}");
    }
}

#[test]
fn simultaneous_joins_converge() {
    let network = LoopbackNetwork::new();
    let mut host = SessionController::new(network.endpoint(), config_for("Host", 8));
    host.create_server().unwrap();

    let mut clients: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let mut client = SessionController::new(network.endpoint(), config_for(name, 8));
            client.join_server("localhost", PORT).unwrap();
            client
        })
        .collect();

    let now = Instant::now();
    // All clients announce before the server sees any of them.
    for client in clients.iter_mut().rev() {
        client.update(now);
    }
    for _ in 0..8 {
        host.update(now);
        for client in &mut clients {
            client.update(now);
        }
    }

    let reference = snapshot(host.players().unwrap());
    assert_eq!(reference.len(), 4);
    for client in &clients {
        assert_eq!(snapshot(client.players().unwrap()), reference);
    }
}

#[test]
fn stored_id_is_the_connection_id() {
    let mut lobby = Lobby::hosting();
    let x = lobby.join("X");

    let local = lobby.clients[x].session().unwrap().local_id().unwrap();
    assert_eq!(local, PeerId::new(2));
    let stored = lobby.host.players().unwrap().get(local).unwrap();
    assert_eq!(stored.peer_id, local);
    assert_eq!(stored.name, "X");
}

#[test]
fn backfill_and_fan_out_counts() {
    let mut lobby = Lobby::hosting();
    let a = lobby.join("A");
    let b = lobby.join("B");
    let before_a = lobby.registry_of(a).len();
    let before_b = lobby.registry_of(b).len();

    let c = lobby.join("C");

    assert_eq!(lobby.registry_of(a).len(), before_a + 1);
    assert_eq!(lobby.registry_of(b).len(), before_b + 1);
    assert!(lobby.registry_of(a).contains(PeerId::new(4)));
    let c_ids: Vec<i32> = lobby.registry_of(c).ids().map(PeerId::get).collect();
    assert_eq!(c_ids, vec![1, 2, 3, 4]);
}

#[test]
fn forged_origin_is_dropped_by_the_server() {
    let mut lobby = Lobby::hosting();
    lobby.join("X");
    let rx = lobby.host.subscribe();
    let before = snapshot(lobby.host.players().unwrap());

    let forged = SessionMessage::RegisterPlayer(PlayerRecord::new(
        PeerId::new(7),
        "Mallory",
        PlayerColor::default(),
    ))
    .to_bytes()
    .unwrap();
    lobby.host.handle_transport_event(
        TransportEvent::Message {
            sender: PeerId::new(2),
            payload: forged,
        },
        Instant::now(),
    );
    lobby.settle();

    assert_eq!(snapshot(lobby.host.players().unwrap()), before);
    assert_eq!(lobby.host.state(), SessionState::Hosting);
    assert!(rx.try_iter().next().is_none());
    assert_eq!(lobby.registry_of(0).len(), 2);
}

#[test]
fn client_relay_is_dropped_by_the_receiver() {
    let mut lobby = Lobby::hosting();
    let x = lobby.join("X");
    let y = lobby.join("Y");
    let before = snapshot(lobby.registry_of(y));

    // A connected peer that never registers writes to Y directly.
    let mut rogue = lobby.network.endpoint();
    rogue.create_client("localhost", PORT).unwrap();
    lobby.settle();
    let payload: Bytes = SessionMessage::RegisterPlayer(PlayerRecord::new(
        PeerId::new(9),
        "Ghost",
        PlayerColor::default(),
    ))
    .to_bytes()
    .unwrap();
    rogue.send_to(PeerId::new(3), payload).unwrap();
    lobby.settle();

    assert_eq!(snapshot(lobby.registry_of(y)), before);
    assert!(!lobby.registry_of(x).contains(PeerId::new(9)));
    assert_eq!(lobby.clients[y].state(), SessionState::Joined);
}

#[test]
fn full_server_fails_the_join() {
    let network = LoopbackNetwork::new();
    let mut host = SessionController::new(network.endpoint(), config_for("Host", 1));
    host.create_server().unwrap();
    let mut first = SessionController::new(network.endpoint(), config_for("A", 1));
    let mut second = SessionController::new(network.endpoint(), config_for("B", 1));
    let rx = second.subscribe();

    first.join_server("localhost", PORT).unwrap();
    second.join_server("localhost", PORT).unwrap();
    let now = Instant::now();
    first.update(now);
    second.update(now);

    assert_eq!(first.state(), SessionState::Joined);
    assert_eq!(second.state(), SessionState::Idle);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![SessionEvent::JoinFailed(JoinFailure::ConnectionFailed)]
    );
}

#[test]
fn leaving_client_stays_in_registries() {
    let mut lobby = Lobby::hosting();
    lobby.join("X");
    lobby.join("Y");
    let rx = lobby.host.subscribe();

    lobby.clients[1].leave();
    lobby.settle();

    assert_eq!(lobby.clients[1].state(), SessionState::Idle);
    assert!(lobby.clients[1].players().is_none());
    assert_eq!(lobby.host.players().unwrap().len(), 3);
    assert_eq!(lobby.registry_of(0).len(), 3);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![SessionEvent::PeerDisconnected(PeerId::new(3))]
    );
}

#[test]
fn rejoining_after_leave_gets_a_fresh_id() {
    let mut lobby = Lobby::hosting();
    let x = lobby.join("X");
    lobby.clients[x].leave();
    lobby.settle();

    lobby.clients[x].join_server("localhost", PORT).unwrap();
    lobby.settle();

    let session = lobby.clients[x].session().unwrap();
    assert_eq!(session.local_id(), Some(PeerId::new(3)));
    assert!(session.is_registered());
    // The stale entry for peer 2 is kept by the host.
    assert_eq!(lobby.host.players().unwrap().len(), 3);
    assert_eq!(session.registry().len(), 3);
}
