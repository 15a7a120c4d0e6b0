use std::path::{Path, PathBuf};

use crate::extractors::VideoMetadata;
use crate::utils::sanitize_filename;
use crate::TranscriptorError;

/// File name of the final transcript inside the output directory
pub const TRANSCRIPT_FILE_NAME: &str = "transcript.txt";

/// Directory name for a video: sanitized title and id joined by an underscore
pub fn output_dir_name(metadata: &VideoMetadata) -> String {
    format!("{}_{}", sanitize_filename(&metadata.title), sanitize_filename(&metadata.id))
}

/// Output failure carrying the underlying OS error, not just the path
fn output_error(e: std::io::Error) -> TranscriptorError {
    TranscriptorError::Output(format!("{:#}", anyhow::Error::from(e)))
}

/// Create `<base>/<title>_<id>` and return its path
pub fn prepare_output_dir(base: &Path, metadata: &VideoMetadata) -> Result<PathBuf, TranscriptorError> {
    let dir = base.join(output_dir_name(metadata));

    fs_err::create_dir_all(&dir).map_err(output_error)?;

    Ok(dir)
}

/// Save the transcript text into `dir`
pub fn write_transcript(dir: &Path, text: &str) -> Result<PathBuf, TranscriptorError> {
    let path = dir.join(TRANSCRIPT_FILE_NAME);

    fs_err::write(&path, text).map_err(output_error)?;

    tracing::info!("Transcript saved: {}", path.display());
    Ok(path)
}

/// Delete the encoded audio once the transcript is safely written
pub fn remove_audio(path: &Path) -> Result<(), TranscriptorError> {
    fs_err::remove_file(path).map_err(output_error)?;

    tracing::info!("Audio file removed: {}", path.display());
    Ok(())
}
