//! Connection registry for the multiplayer server
//!
//! This module owns the set of accepted client connections behind a single
//! lock scope, including:
//! - Capacity-enforced registration of new sockets
//! - Player id assignment at accept time
//! - Dead-connection pruning and cleanup
//! - Best-effort state broadcasting
//!
//! The accept loop registers connections and the simulate loop prunes,
//! drains, and broadcasts; both go through this one coordinator so no
//! connection is ever read by one context while the other removes it.

use crate::connection::Connection;
use log::info;
use tokio::net::TcpStream;

/// Manages all accepted client connections
///
/// Connection ids come from a monotonic counter and stay unique for the
/// lifetime of the server. Player ids are the live-connection count at
/// accept time, so a slot freed by a disconnect is handed to the next
/// client and ids always stay within the fixed player range.
pub struct ConnectionManager {
    /// Registered connections in accept order
    connections: Vec<Connection>,
    /// Next connection id to hand out
    next_connection_id: u32,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Vec::new(),
            next_connection_id: 0,
            max_connections,
        }
    }

    /// Attempts to register a newly accepted socket
    ///
    /// Returns `Some((connection_id, player_id))` on success. At capacity the
    /// socket is dropped on the spot, closing it at the transport level
    /// without any protocol-level rejection message.
    pub fn register(&mut self, stream: TcpStream) -> Option<(u32, u32)> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;
        let player_id = self.connections.len() as u32;

        let mut connection = Connection::new(stream, connection_id);
        connection.set_player_id(player_id);
        info!(
            "client connected: connection={} player={}",
            connection_id, player_id
        );
        self.connections.push(connection);

        Some((connection_id, player_id))
    }

    /// Drops every connection whose liveness flag went false
    ///
    /// Returns how many connections were removed. Closing the underlying
    /// sockets happens implicitly when the connections drop.
    pub fn prune_dead(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|conn| {
            if !conn.is_alive() {
                info!("client disconnected: connection={}", conn.id());
            }
            conn.is_alive()
        });
        before - self.connections.len()
    }

    /// Sends one frame to every connection, best effort
    ///
    /// A send failure only marks that one connection dead; it is removed on
    /// the next prune pass. Returns the number of successful deliveries.
    pub async fn broadcast(&mut self, frame: &[u8]) -> usize {
        let mut delivered = 0;
        for connection in self.connections.iter_mut() {
            if connection.send(frame).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Mutable iteration, used by the simulate loop to drain client frames
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    /// Marks every connection closed and releases the sockets
    pub fn close_all(&mut self) {
        for connection in self.connections.iter_mut() {
            connection.close();
        }
        self.connections.clear();
    }

    /// Returns the number of currently registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
