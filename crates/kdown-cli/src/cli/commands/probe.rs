//! `kdown probe` – show what the server reports for a URL.

use anyhow::Result;
use kdown_core::config::KdownConfig;
use kdown_core::transfer::BlockingWorker;
use kdown_core::url_model;
use kdown_core::TransferExecutor;
use std::sync::Arc;

pub async fn run_probe(cfg: &KdownConfig, url: &str) -> Result<()> {
    let parsed = url_model::check_scheme(url)?;
    let executor = Arc::new(TransferExecutor::from_config(cfg));
    let target = url.to_string();
    let probe = tokio::task::spawn_blocking(move || {
        let _worker = BlockingWorker::enter();
        executor.probe(&target)
    })
    .await??;

    println!("url:        {}", url);
    println!("name:       {}", url_model::resolve_name(&parsed, None));
    match probe.content_length {
        Some(len) => println!("length:     {} bytes", len),
        None => println!("length:     unknown"),
    }
    println!("resumable:  {}", if probe.resumable { "yes" } else { "no" });
    println!("etag:       {}", probe.etag.as_deref().unwrap_or("-"));
    Ok(())
}
