//! Server network layer handling TCP connections and game loop coordination

use crate::connection_manager::ConnectionManager;
use crate::game::{GameLogic, SPAWN_TABLE};
use log::{debug, error, info, warn};
use shared::{Direction, Message, MAX_PLAYERS, TICK_INTERVAL_MS};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

/// How long the accept loop waits for a connection before re-checking the
/// stop flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Idle sleep between simulate-loop iterations.
const LOOP_IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Events sent from the accept task to the simulate loop
#[derive(Debug)]
pub enum ServerEvent {
    ClientConnected {
        connection_id: u32,
        player_id: u32,
        total: usize,
    },
}

/// Last received direction per player slot, consumed once per tick.
/// Slots start out at the spawn headings so a silent player keeps moving
/// the way it spawned.
pub struct InputTable {
    slots: [Direction; MAX_PLAYERS],
}

impl InputTable {
    pub fn new() -> Self {
        let mut slots = [Direction::Right; MAX_PLAYERS];
        for (slot, entry) in slots.iter_mut().enumerate() {
            *entry = SPAWN_TABLE[slot].1;
        }
        InputTable { slots }
    }

    /// Records the latest command for a player. Out-of-range ids are ignored.
    pub fn set(&mut self, player_id: u32, direction: Direction) {
        if let Some(slot) = self.slots.get_mut(player_id as usize) {
            *slot = direction;
        }
    }

    pub fn snapshot(&self) -> [Direction; MAX_PLAYERS] {
        self.slots
    }
}

/// Main server coordinating connection handling and the game simulation.
///
/// Two execution contexts run after `run` is called: a spawned accept task
/// that registers new connections, and the simulate loop itself, which
/// drains client frames, advances the game on a fixed tick, and broadcasts
/// the resulting state. The connection set is shared between them behind a
/// single lock; the game is touched only by the simulate loop.
pub struct GameServer {
    listener: Arc<TcpListener>,
    connections: Arc<RwLock<ConnectionManager>>,
    inputs: Arc<Mutex<InputTable>>,
    game: GameLogic,
    tick_interval: Duration,
    running: Arc<AtomicBool>,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl GameServer {
    /// Binds the listening socket. A bind failure aborts server start.
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(GameServer {
            listener: Arc::new(listener),
            connections: Arc::new(RwLock::new(ConnectionManager::new(MAX_PLAYERS))),
            inputs: Arc::new(Mutex::new(InputTable::new())),
            game: GameLogic::new(),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            running: Arc::new(AtomicBool::new(true)),
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle used to request a cooperative stop from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Shared handle to the connection set.
    pub fn connections_handle(&self) -> Arc<RwLock<ConnectionManager>> {
        Arc::clone(&self.connections)
    }

    /// Spawns the task that accepts new client connections
    fn spawn_accept_loop(&self) -> JoinHandle<()> {
        let listener = Arc::clone(&self.listener);
        let connections = Arc::clone(&self.connections);
        let running = Arc::clone(&self.running);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            info!("accept loop started");
            while running.load(Ordering::SeqCst) {
                match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                    Ok(Ok((stream, addr))) => {
                        let mut guard = connections.write().await;
                        match guard.register(stream) {
                            Some((connection_id, player_id)) => {
                                let total = guard.len();
                                drop(guard);
                                debug!("accepted {} as connection {}", addr, connection_id);
                                let event = ServerEvent::ClientConnected {
                                    connection_id,
                                    player_id,
                                    total,
                                };
                                if event_tx.send(event).is_err() {
                                    // Simulate loop is gone; nothing left to do.
                                    break;
                                }
                            }
                            None => {
                                info!("max connections reached, rejecting client from {}", addr);
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("accept failed: {}", e);
                        sleep(ACCEPT_POLL_INTERVAL).await;
                    }
                    Err(_) => {
                        // Poll timeout; loop around and re-check the stop flag.
                    }
                }
            }
            info!("accept loop stopped");
        })
    }

    /// Runs the simulate loop until the stop flag drops, then joins the
    /// accept task and closes every connection. No error terminates the
    /// loop; failures are logged and the affected connection is pruned.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let accept_handle = self.spawn_accept_loop();
        info!("game loop started");

        let mut last_tick = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            self.drain_events();
            self.pump_client_frames().await;

            // Tick cadence comes from wall-clock comparison, not from the
            // idle sleep below.
            if last_tick.elapsed() >= self.tick_interval {
                self.advance_tick().await;
                last_tick = Instant::now();
            }

            sleep(LOOP_IDLE_SLEEP).await;
        }

        info!("game loop stopped");
        let _ = accept_handle.await;
        self.connections.write().await.close_all();
        Ok(())
    }

    /// Processes accept-task events. The game is initialized exactly once,
    /// when the first connection arrives while no game is active.
    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                ServerEvent::ClientConnected {
                    connection_id,
                    player_id,
                    total,
                } => {
                    debug!(
                        "connection {} registered as player {}",
                        connection_id, player_id
                    );
                    if total == 1 && !self.game.is_active() {
                        self.game.init(MAX_PLAYERS);
                    }
                }
            }
        }
    }

    /// Prunes dead connections, then drains every pending frame into the
    /// input table. An explicit playerId in a frame wins over the sending
    /// connection's assigned id; malformed or unexpected frames are logged
    /// and dropped without a response.
    async fn pump_client_frames(&mut self) {
        let mut connections = self.connections.write().await;
        connections.prune_dead();

        for conn in connections.iter_mut() {
            for frame in conn.poll_frames() {
                match Message::from_line(&frame) {
                    Ok(Message::Input {
                        player_id,
                        direction,
                    }) => {
                        let target = player_id.or_else(|| conn.player_id());
                        if let Some(target) = target {
                            self.inputs.lock().await.set(target, direction);
                        }
                    }
                    Ok(message) => {
                        warn!(
                            "connection {} sent an unexpected message, ignoring: {:?}",
                            conn.id(),
                            message
                        );
                    }
                    Err(e) => {
                        warn!(
                            "connection {} sent a malformed frame, discarding: {}",
                            conn.id(),
                            e
                        );
                    }
                }
            }
        }
    }

    /// One tick boundary: apply buffered inputs, advance the game, and
    /// broadcast the snapshot to every live connection.
    async fn advance_tick(&mut self) {
        {
            let inputs = self.inputs.lock().await;
            self.game.apply_inputs(&inputs.snapshot());
        }
        self.game.tick();

        let message = Message::state(self.game.snapshot());
        match message.to_line() {
            Ok(line) => {
                let mut connections = self.connections.write().await;
                connections.broadcast(line.as_bytes()).await;
            }
            Err(e) => {
                error!("failed to serialize game state: {}", e);
            }
        }
    }
}
