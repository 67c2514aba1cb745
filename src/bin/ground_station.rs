use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tracing::Level;

use dronelink::link_config::LinkConfig;
use dronelink::media::demo::TracingDisplay;
use dronelink::media::demo::UncompressedCodec;
use dronelink::metrics::link_stats::LinkStatsSink;
use dronelink::receiver::VideoReceiver;
use dronelink::transport::UdpTransport;

/// Receives video streams from drones, one session per drone, and reports link statistics.
#[derive(Parser, Debug)]
struct Args {
    /// listen address; defaults to all interfaces on the well-known port
    #[arg(long)]
    listen: Option<SocketAddr>,
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
    let listen = args.listen
        .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.listen_port));

    let transport = Arc::new(UdpTransport::bind(listen).await?);

    let receiver = VideoReceiver::new(
        config.clone(),
        transport,
        Arc::new(UncompressedCodec),
        Arc::new(TracingDisplay),
        LinkStatsSink::new(config),
    );

    receiver.run().await
}
