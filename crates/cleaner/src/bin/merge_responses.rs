use anyhow::Result;
use cleaner::{CleanerConfig, ResponseMerger, TracingObserver};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = CleanerConfig::load_or_default(Path::new(cleaner::config::CONFIG_FILE)).await?;
    let patterns = config.compile_patterns()?;

    let merger = ResponseMerger::new(patterns, config.selection());
    let report = merger
        .merge_json_to_txt(&config.folder, &config.output_file, &mut TracingObserver)
        .await?;

    tracing::info!(
        merged = report.merged.len(),
        skipped = report.skipped.len(),
        "Merge complete"
    );

    Ok(())
}
