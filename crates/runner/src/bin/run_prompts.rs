use anyhow::Result;
use runner::{config::CONFIG_FILE, PromptRunner, RunnerConfig, TracingObserver};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = RunnerConfig::load_or_default(Path::new(CONFIG_FILE))
        .await?
        .with_env_overrides();

    info!(
        cwd = %std::env::current_dir()?.display(),
        input = %config.input_file.display(),
        "Looking for prompts"
    );

    let mut runner = PromptRunner::from_config(&config)?;

    runner
        .process_prompts_with(
            &config.input_file,
            &config.output_file,
            config.use_chat,
            config.save_policy,
            &mut TracingObserver,
        )
        .await?;

    Ok(())
}
