//! # Demo: a service with three timers.
//!
//! Starts a service on a temporary database, runs a few timers through
//! their lifecycle (one completes, one is paused and resumed, one is
//! cancelled), and prints every event via the built-in [`LogWriter`].
//!
//! ## Run
//! ```bash
//! cargo run --example countdown_demo --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use countdown::{Config, LogWriter, Service, Subscribe};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        db_path: std::env::temp_dir().join("countdown-demo.db"),
        tick: Duration::from_millis(500),
        ..Config::default()
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let service = Service::start(cfg, subs).await?;

    // Runs to completion; we drain its stream from a background task.
    let finishing = service.start_timer(1, 5).await?;
    let mut output = finishing.take_output().await.ok_or("output taken")?;
    let drain = tokio::spawn(async move {
        while let Some(remaining) = output.recv().await {
            println!("timer 1: t-minus {remaining}");
        }
        println!("timer 1: done");
    });

    // Paused halfway, then resumed. Its stream is never read, so after
    // one buffered tick it waits for a consumer (ticking is
    // consumer-paced) until the cleanup below.
    service.start_timer(2, 8).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    service.pause_timer(2).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    service.resume_timer(2).await?;

    // Cancelled before it gets anywhere.
    service.start_timer(3, 1000).await?;
    service.cancel_timer(3).await?;

    drain.await?;
    println!("live timers: {:?}", service.active_timers().await);

    // Leave the temp store empty so the next demo run starts fresh.
    service.cancel_timer(2).await?;
    service.shutdown().await?;
    Ok(())
}
