use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript::{utils, Cli, Config, TranscriptionPipeline, TranscriptorError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt_transcript=debug"
    } else {
        "yt_transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), TranscriptorError> {
    // Credentials are resolved before anything touches the network
    let mut config = Config::load(cli.env_file.as_deref())?;
    config.app.output_base = cli.output_dir.clone();
    config.app.keep_audio = cli.keep_audio();
    config.app.show_progress = !cli.quiet;
    tracing::debug!(?config, "Configuration loaded");

    // Check for required external dependencies (non-fatal)
    for dep in utils::check_dependencies().await {
        tracing::warn!("Missing dependency: {}", dep);
    }

    let pipeline = TranscriptionPipeline::new(config)?;
    let summary = pipeline.transcribe_from_url(&cli.url).await?;

    println!("Output directory: {}", summary.output_dir.display());
    println!(
        "Transcript saved to: {} ({} segment{})",
        summary.transcript_path.display(),
        summary.segment_count,
        if summary.segment_count == 1 { "" } else { "s" }
    );
    match summary.audio_path {
        Some(audio_path) => println!("Audio saved to: {}", audio_path.display()),
        None => println!("Audio file removed."),
    }

    Ok(())
}
