//! Demo and load client
//!
//! Opens one or more raw TCP connections, authenticates each with its own
//! uid, heartbeats on an interval and logs every frame the gateway sends.
//!
//! ```bash
//! cargo run -p comet-gateway --bin comet-client -- --addr 127.0.0.1:8080 --uid 1 --count 100
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use comet_common::try_init_tracing;
use comet_gateway::protocol::{AuthAckPayload, AuthPayload, HeartbeatPayload, OpCode, Proto};
use comet_gateway::round::BufferPool;
use comet_gateway::transport::{FrameReader, FrameWriter, TcpFrameReader, TcpFrameWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{error, info};

/// Largest frame body the client accepts from the gateway
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Debug, Parser)]
#[command(name = "comet-client", about = "Comet gateway demo and load client")]
struct Args {
    /// Gateway raw TCP address
    #[arg(long, env = "COMET_CLIENT_ADDR", default_value = "127.0.0.1:8080")]
    addr: String,

    /// Uid of the first connection; connection `n` uses `uid + n`
    #[arg(long, env = "COMET_CLIENT_UID", default_value_t = 1)]
    uid: u32,

    /// Credential sent in the auth frame
    #[arg(long, env = "COMET_CLIENT_CODE", default_value = "demo")]
    code: String,

    /// Heartbeat interval in seconds
    #[arg(long, env = "COMET_CLIENT_INTERVAL", default_value_t = 30)]
    interval: u64,

    /// Parallel connections
    #[arg(long, env = "COMET_CLIENT_COUNT", default_value_t = 1)]
    count: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arc::new(Args::parse());
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    let pool = BufferPool::new(args.count as usize * 2, 1024);
    let clients = (0..args.count).map(|n| {
        let args = Arc::clone(&args);
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let uid = args.uid.wrapping_add(n);
            if let Err(e) = run_client(&args, &pool, uid).await {
                error!(uid, error = %format!("{e:#}"), "client ended");
            }
        })
    });
    futures::future::join_all(clients).await;
    Ok(())
}

async fn run_client(args: &Args, pool: &Arc<BufferPool>, uid: u32) -> anyhow::Result<()> {
    let stream = TcpStream::connect(&args.addr)
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = TcpFrameReader::new(read_half, pool.acquire(), MAX_BODY_SIZE);
    let mut writer = TcpFrameWriter::new(write_half, pool.acquire());

    let auth = serde_json::to_vec(&AuthPayload {
        uid,
        code: args.code.clone(),
    })?;
    writer.write_frame(&Proto::new(OpCode::Auth, auth).with_seq(1)).await?;
    writer.flush().await?;

    let mut proto = Proto::default();
    reader.read_frame(&mut proto).await?;
    if proto.op_code() != Some(OpCode::AuthReply) {
        bail!("expected auth reply, got op {}", proto.op);
    }
    let ack: AuthAckPayload = serde_json::from_slice(&proto.body)?;
    info!(uid, id = ack.id, zone = ack.zone, heartbeat_ms = ack.heartbeat_ms, "authenticated");

    let interval = Duration::from_secs(args.interval.max(1));
    let heartbeats = tokio::spawn(heartbeat(writer, uid, interval));

    let result = loop {
        if let Err(e) = reader.read_frame(&mut proto).await {
            break Err(e.into());
        }
        info!(
            uid,
            op = proto.op,
            seq = proto.seq,
            body = %String::from_utf8_lossy(&proto.body),
            "received"
        );
    };
    heartbeats.abort();
    result
}

async fn heartbeat(
    mut writer: TcpFrameWriter,
    uid: u32,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut seq: i32 = 2;
    loop {
        ticker.tick().await;
        let body = serde_json::to_vec(&HeartbeatPayload { uid, x: 0.0, y: 0.0 })?;
        writer
            .write_frame(&Proto::new(OpCode::Heartbeat, body).with_seq(seq))
            .await?;
        writer.flush().await?;
        seq = seq.wrapping_add(1);
    }
}
