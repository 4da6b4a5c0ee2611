//! Speech synthesis command

use crate::app::App;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use vanguard_core::{ResultExt, VanguardResult};

pub async fn run(app: &App, text: &str, out: &Path) -> VanguardResult<()> {
    let tts = app.controller.tts_service()?;
    let mut chunks = app.controller.generate_speech(text).await?;

    let mut file = tokio::fs::File::create(out)
        .await
        .with_context(|| format!("Creating {}", out.display()))?;
    let mut written = 0usize;
    while let Some(chunk) = chunks.next().await {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Writing {}", out.display()))?;
        written += chunk.len();
    }
    file.flush().await.context("Flushing audio file")?;

    app.console.success(&format!(
        "Wrote {} bytes of audio to {}",
        written,
        out.display()
    ));
    let stats = tts.cache_stats();
    app.console.detail(&format!(
        "Speech cache: {} entries, {} bytes",
        stats.entries, stats.total_bytes
    ));
    Ok(())
}
