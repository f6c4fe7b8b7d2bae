// demos/advanced_usage.rs
// Run with: cargo run --example advanced_usage

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use simple_sftp::{ConnectOptions, Error, OpenMode, Session};
use tokio::io::AsyncReadExt;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Example 1: Scoped session, closed whatever happens inside
    example_scoped_session().await?;

    // Example 2: Working directory scopes and scoped file handles
    example_cd_and_open().await?;

    // Example 3: Conditional upload with size check and timeout
    example_sync_with_timeout().await?;

    // Example 4: Error handling and retry logic
    example_with_retry().await?;

    Ok(())
}

fn options() -> ConnectOptions {
    ConnectOptions::new("example.com")
        .username("user")
        .password("password")
}

/// Example 1: Connect, work, and close in one call
async fn example_scoped_session() -> anyhow::Result<()> {
    println!("\n=== Example 1: Scoped Session ===");

    let output = Session::scoped(options(), |session| {
        Box::pin(async move { session.execute_output("df -h /").await })
    })
    .await?;

    println!("exit status: {:?}", output.exit_status);
    print!("{}", String::from_utf8_lossy(&output.stdout));
    Ok(())
}

/// Example 2: Temporarily change directory and read a file
async fn example_cd_and_open() -> anyhow::Result<()> {
    println!("\n=== Example 2: cd and open ===");

    let mut session = Session::connect(options()).await?;

    let names = session
        .cd("/var/log", |s| Box::pin(async move { s.listdir(None).await }))
        .await?;
    println!("📂 /var/log has {} entries", names.len());
    println!("📍 back in {:?}", session.getcwd().await?);

    let hostname = session
        .open("/etc/hostname", OpenMode::read(), |file| {
            Box::pin(async move {
                let mut text = String::new();
                file.read_to_string(&mut text)
                    .await
                    .map_err(|e| Error::remote("/etc/hostname", e))?;
                Ok(text)
            })
        })
        .await?;
    println!("🖥  remote hostname: {}", hostname.trim());

    session.close().await?;
    Ok(())
}

/// Example 3: Upload only when the remote copy differs in size
async fn example_sync_with_timeout() -> anyhow::Result<()> {
    println!("\n=== Example 3: Sync With Timeout ===");

    let mut session = Session::connect(options()).await?;
    let local = Path::new("/local/large_file.bin");
    let remote = "/remote/backups/large_file.bin";

    if session.size_match(remote, Some(local)).await? {
        println!("✅ {remote} already up to date");
    } else {
        match timeout(Duration::from_secs(30), session.mkdir_put(local, Some(remote))).await {
            Ok(Ok(upload)) => println!("✅ Uploaded {} bytes", upload.file_size),
            Ok(Err(e)) => println!("❌ Upload failed: {e}"),
            Err(_) => println!("⏱️  Upload timed out"),
        }
    }

    session.close().await?;
    Ok(())
}

/// Example 4: Retry the connection a few times
async fn example_with_retry() -> anyhow::Result<()> {
    println!("\n=== Example 4: Retry Logic ===");

    let max_retries = 3;
    let mut session = None;
    for attempt in 1..=max_retries {
        match Session::connect(options()).await {
            Ok(connected) => {
                session = Some(connected);
                break;
            }
            Err(e @ (Error::Authentication { .. } | Error::Configuration(_))) => {
                return Err(e).context("Not retrying");
            }
            Err(e) => {
                println!("⚠️  Attempt {attempt}/{max_retries} failed: {e}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }

    let mut session = session.context("All connection attempts failed")?;
    if session.exists("/remote/data").await? {
        println!("✅ /remote/data is there");
    }
    session.close().await?;
    Ok(())
}
