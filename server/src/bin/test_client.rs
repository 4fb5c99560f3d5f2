use clap::Parser;
use shared::{Direction, Message, DEFAULT_PORT};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Headless test client for the snake arcade server.
/// Connects over TCP, cycles through direction commands, and prints a
/// one-line summary of every state broadcast it receives.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host to connect to
    #[clap(default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Player slot to steer (defaults to the slot the server assigns)
    #[clap(long)]
    player: Option<u32>,
    /// How many input commands to send before disconnecting
    #[clap(long, default_value = "100")]
    commands: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let stream = TcpStream::connect(&address).await?;
    println!("connected to {}", address);

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // Reader task: one summary line per broadcast.
    let reader = tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            match Message::from_line(&line) {
                Ok(Message::State {
                    active,
                    players,
                    food,
                }) => {
                    let summary: Vec<String> = players
                        .iter()
                        .map(|p| {
                            format!(
                                "p{} {} score={} len={}",
                                p.id,
                                if p.alive { "alive" } else { "dead" },
                                p.score,
                                p.body.len()
                            )
                        })
                        .collect();
                    println!(
                        "state active={} food={} | {}",
                        active,
                        food.len(),
                        summary.join(" | ")
                    );
                }
                Ok(other) => println!("unexpected message: {:?}", other),
                Err(e) => println!("bad frame: {}", e),
            }
        }
        println!("server closed the connection");
    });

    // Turn 90 degrees every ten commands; a straight repeat of the current
    // heading is accepted, a reversal would be dropped by the server anyway.
    let headings = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];
    for i in 0..args.commands as usize {
        let message = Message::Input {
            player_id: args.player,
            direction: headings[(i / 10) % headings.len()],
        };
        let line = message.to_line()?;
        if write_half.write_all(line.as_bytes()).await.is_err() {
            println!("server went away, stopping input");
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }

    drop(write_half);
    let _ = reader.await;
    println!("test client finished");
    Ok(())
}
