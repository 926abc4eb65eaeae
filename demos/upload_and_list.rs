//! Upload a file and list the newest stored files
//!
//! Run with: UCARE_PUBLIC_KEY=... UCARE_SECRET_KEY=... cargo run --example upload_and_list -- <path>

use std::env;
use std::fs::File;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ucare_client::{Client, Config, FileParams, ListParams, Ordering, StoreMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let log_level = if env::var("UCARE_DEBUG").is_ok() { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("ucare_client={},upload_and_list={}", log_level, log_level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: upload_and_list <path>"))?;

    let mut config = Config::new(env::var("UCARE_PUBLIC_KEY")?, env::var("UCARE_SECRET_KEY")?);
    if env::var("UCARE_SIGNED_UPLOADS").is_ok() {
        config = config.with_signed_uploads();
    }
    let client = Client::new(config)?;

    let name = std::path::Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mut file = File::open(&path)?;

    let id = client
        .upload_file(FileParams::new(&mut file, name).with_store(StoreMode::Always))
        .await?;
    tracing::info!("Uploaded {} as {}", path, id);

    let page = client
        .list_files(
            ListParams::new()
                .stored(true)
                .limit(10)
                .ordering(Ordering::UploadedAtDesc),
        )
        .await?;

    tracing::info!("{} stored files, newest first:", page.total);
    for file in &page.results {
        tracing::info!(
            "  {} {} ({} bytes)",
            file.uuid,
            file.original_filename.as_deref().unwrap_or("-"),
            file.size
        );
    }

    Ok(())
}
