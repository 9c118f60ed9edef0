use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kingside_server::config::ServerConfig;
use kingside_server::connection;
use kingside_server::registry::Registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kingside_server=info")),
        )
        .init();

    let config = ServerConfig::default();
    let bind_address = config.bind_address;

    let (registry, commands, mailbox) = Registry::new(config);
    tokio::spawn(registry.run(mailbox));

    let listener = TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(peer = %peer, "incoming connection");
        tokio::spawn(connection::handle_connection(stream, commands.clone()));
    }
}
