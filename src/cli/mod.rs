use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "yt-transcript",
    about = "Download a YouTube video's audio and transcribe it",
    version,
    long_about = "Downloads the best available audio track of a YouTube video, re-encodes it to MP3, splits it into ten-minute segments when it is too large for the transcription API, and writes the joined transcript to <output-dir>/<title>_<id>/transcript.txt."
)]
pub struct Cli {
    /// YouTube video URL to transcribe
    #[arg(value_name = "URL")]
    pub url: String,

    /// Base directory for output
    #[arg(short, long, value_name = "DIR", default_value = "./transcripts")]
    pub output_dir: PathBuf,

    /// Keep the downloaded audio file (default)
    #[arg(long, overrides_with = "no_keep_audio")]
    pub keep_audio: bool,

    /// Delete the downloaded audio file after a successful run
    #[arg(long, overrides_with = "keep_audio")]
    pub no_keep_audio: bool,

    /// Dotenv file holding OPENAI_API_KEY (defaults to ./.env when present)
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Whether `audio.mp3` survives the run
    pub fn keep_audio(&self) -> bool {
        !self.no_keep_audio
    }
}
