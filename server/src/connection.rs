//! One accepted client socket with explicit liveness and newline framing.

use log::{debug, warn};
use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const RECV_BUFFER_SIZE: usize = 4096;

/// Owns one client stream. Any send or receive failure, or an orderly close
/// by the peer, flips the liveness flag; the server prunes dead connections
/// on its next housekeeping pass. No retries happen at this layer.
pub struct Connection {
    stream: TcpStream,
    id: u32,
    player_id: Option<u32>,
    alive: bool,
    frame_buf: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream, id: u32) -> Self {
        Connection {
            stream,
            id,
            player_id: None,
            alive: true,
            frame_buf: Vec::new(),
        }
    }

    /// Writes the whole payload, looping until it is flushed. Returns false
    /// and marks the connection dead on any failure.
    pub async fn send(&mut self, data: &[u8]) -> bool {
        if !self.alive {
            return false;
        }
        match self.stream.write_all(data).await {
            Ok(()) => true,
            Err(e) => {
                debug!("send to connection {} failed: {}", self.id, e);
                self.alive = false;
                false
            }
        }
    }

    /// Best-effort non-blocking read of one buffer's worth of data. Returns
    /// an empty result when nothing is available; an orderly peer close or a
    /// read error marks the connection dead. Never blocks the caller.
    pub fn receive(&mut self) -> Vec<u8> {
        if !self.alive {
            return Vec::new();
        }
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match self.stream.try_read(&mut buf) {
            Ok(0) => {
                debug!("connection {} closed by peer", self.id);
                self.alive = false;
                Vec::new()
            }
            Ok(n) => buf[..n].to_vec(),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Vec::new(),
            Err(e) => {
                warn!("receive on connection {} failed: {}", self.id, e);
                self.alive = false;
                Vec::new()
            }
        }
    }

    /// Drains all pending bytes and returns the complete newline-terminated
    /// frames. Partial frames stay buffered until the rest arrives.
    pub fn poll_frames(&mut self) -> Vec<String> {
        loop {
            let chunk = self.receive();
            if chunk.is_empty() {
                break;
            }
            self.frame_buf.extend_from_slice(&chunk);
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.frame_buf.iter().position(|&b| b == b'\n') {
            let frame: Vec<u8> = self.frame_buf.drain(..=pos).collect();
            match String::from_utf8(frame) {
                Ok(text) => frames.push(text.trim_end().to_string()),
                Err(_) => warn!("connection {} sent a non-UTF-8 frame, discarding", self.id),
            }
        }
        frames
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Idempotent. The socket handle itself is released when the connection
    /// is dropped.
    pub fn close(&mut self) {
        self.alive = false;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn set_player_id(&mut self, player_id: u32) {
        self.player_id = Some(player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::time::{sleep, Duration};

    async fn socket_pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        (Connection::new(server_side, 1), client)
    }

    #[tokio::test]
    async fn test_receive_is_empty_when_idle() {
        let (mut conn, _client) = socket_pair().await;
        assert!(conn.receive().is_empty());
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_poll_frames_splits_on_newline() {
        let (mut conn, mut client) = socket_pair().await;

        client.write_all(b"first\nsecond\n").await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let frames = conn.poll_frames();
        assert_eq!(frames, vec!["first".to_string(), "second".to_string()]);
        assert!(conn.poll_frames().is_empty());
    }

    #[tokio::test]
    async fn test_partial_frame_stays_buffered() {
        let (mut conn, mut client) = socket_pair().await;

        client.write_all(b"{\"type\":\"in").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(conn.poll_frames().is_empty());

        client.write_all(b"put\",\"direction\":1}\n").await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let frames = conn.poll_frames();
        assert_eq!(frames, vec![r#"{"type":"input","direction":1}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_peer_close_marks_connection_dead() {
        let (mut conn, client) = socket_pair().await;

        drop(client);
        sleep(Duration::from_millis(50)).await;

        assert!(conn.receive().is_empty());
        assert!(!conn.is_alive());
        // Dead connections stay dead and quiet.
        assert!(conn.receive().is_empty());
        assert!(!conn.send(b"late\n").await);
    }

    #[tokio::test]
    async fn test_send_reaches_the_peer() {
        let (mut conn, client) = socket_pair().await;

        assert!(conn.send(b"hello\n").await);

        let mut buf = [0u8; 16];
        client.readable().await.unwrap();
        let n = client.try_read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello\n");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut conn, _client) = socket_pair().await;

        conn.close();
        assert!(!conn.is_alive());
        conn.close();
        assert!(!conn.is_alive());
    }

    #[tokio::test]
    async fn test_player_id_assignment() {
        let (mut conn, _client) = socket_pair().await;

        assert_eq!(conn.player_id(), None);
        conn.set_player_id(2);
        assert_eq!(conn.player_id(), Some(2));
        assert_eq!(conn.id(), 1);
    }
}
