use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};

use dronelink::link_config::LinkConfig;
use dronelink::media::demo::{TestPatternSource, UncompressedCodec};
use dronelink::sender::VideoSender;
use dronelink::transport::UdpTransport;

/// Streams a test pattern to a ground station after a clock synchronization handshake.
#[derive(Parser, Debug)]
struct Args {
    /// ground station address
    #[arg(long, default_value = "127.0.0.1:5060")]
    to: SocketAddr,

    /// number of frames to stream
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// test pattern width in pixels
    #[arg(long, default_value_t = 120)]
    width: u32,

    /// test pattern height in pixels
    #[arg(long, default_value_t = 90)]
    height: u32,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config = Arc::new(LinkConfig::default());
    let transport = Arc::new(UdpTransport::bind("0.0.0.0:0".parse()?).await?);

    let sender = VideoSender::new(transport, args.to, config);
    let mut source = TestPatternSource::new(
        args.width,
        args.height,
        args.frames,
        Duration::from_secs(1) / args.fps.max(1),
    );

    let sent = sender.run(&mut source, &UncompressedCodec).await?;
    info!(sent, "transmission finished");
    Ok(())
}
