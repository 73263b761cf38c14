use bytes::Bytes;
use std::time::Duration;
use tokio::{io::BufReader, sync::mpsc};
use tracing::{error, info};
use tricklers::{Result, SessionId, Trickler, TricklerConfig};

/// Pipe scale output into stdin, e.g.
/// `cat /dev/ttyUSB0 | cargo run --example stdin_bridge`
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let trickler = Trickler::new(TricklerConfig::default())?;
    let bridge = trickler.bridge();

    // Stand-in for a remote client subscribed to the auto-mode channel
    let session = SessionId::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    bridge.on_subscribe(session, tx).await;

    tokio::spawn(async move {
        while let Some(value) = rx.recv().await {
            println!("📡 notify {:02X?}", &value[..]);
        }
    });

    // Switch auto mode on shortly after start, as a client would
    let writer = trickler.bridge();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        match writer.on_write_request(&[1], 0).await {
            Ok(()) => info!("Auto mode on requested"),
            Err(e) => error!("Write rejected: {}", e),
        }
    });

    if let Err(e) = trickler.run(BufReader::new(tokio::io::stdin())).await {
        error!("Serial input failed: {}", e);
        return Err(e);
    }

    bridge.on_unsubscribe(session).await;

    let snapshot = trickler.snapshot().await;
    println!("\n📊 Final state:");
    println!("  Status:       {}", snapshot.status);
    println!(
        "  Weight:       {} {}",
        snapshot.weight.as_deref().unwrap_or("-"),
        snapshot.unit.map_or_else(String::new, |u| u.to_string())
    );
    println!("  Auto mode:    {}", snapshot.auto_mode);
    println!("  Readings:     {}", snapshot.readings);
    println!("  Scale errors: {}", snapshot.device_errors);

    Ok(())
}
