// demos/basic_usage.rs
// Run with: cargo run --example basic_usage

use std::path::Path;

use anyhow::Context;
use simple_sftp::{ConnectOptions, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // 1. Connect to SSH server (password wins; otherwise ~/.ssh/id_rsa or id_dsa)
    let options = ConnectOptions::new("example.com")
        .username("your_username")
        .private_key("~/.ssh/id_rsa");
    let mut session = Session::connect(options)
        .await
        .context("Connection failed")?;

    println!("✅ Connected to {}@{}", session.username(), session.host());

    // 2. List files in remote directory
    println!("\n📂 Listing files in /remote/directory...");
    let files = session.listdir(Some("/remote/directory")).await?;
    for name in &files {
        println!("  - {name}");
    }
    println!("Found {} files", files.len());

    // 3. Upload a file, creating the remote directories it needs
    println!("\n⬆️  Uploading file...");
    let upload = session
        .mkdir_put(
            Path::new("/local/path/document.pdf"),
            Some("/remote/path/document.pdf"),
        )
        .await?;
    println!("✅ Upload completed: {} bytes transferred", upload.file_size);

    // 4. Download a file
    println!("\n⬇️  Downloading file...");
    let download = session
        .get(
            "/remote/path/config.json",
            Some(Path::new("/local/path/config.json")),
        )
        .await?;
    println!("✅ Download completed: {} bytes transferred", download.file_size);

    // 5. Run a command
    for line in session.execute("uname -a").await? {
        println!("🖥  {line}");
    }

    // 6. Cleanup
    println!("\n🧹 Cleaning up...");
    session.close().await?;

    println!("✅ All done!");

    Ok(())
}
