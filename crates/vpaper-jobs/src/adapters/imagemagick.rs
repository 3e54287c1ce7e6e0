//! ImageMagickThumbnailer — renders previews with ImageMagick `convert`.
//!
//! `convert -thumbnail x<size> -background white -alpha remove <source>[<page>] <output>`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use vpaper_core::defaults::THUMBNAIL_CMD_TIMEOUT_SECS;
use vpaper_core::{Error, Result, ThumbnailGenerator};

/// Thumbnail generator backed by an ImageMagick binary.
#[derive(Debug, Clone)]
pub struct ImageMagickThumbnailer {
    program: String,
    timeout_secs: u64,
}

impl Default for ImageMagickThumbnailer {
    fn default() -> Self {
        Self {
            program: "convert".to_string(),
            timeout_secs: THUMBNAIL_CMD_TIMEOUT_SECS,
        }
    }
}

impl ImageMagickThumbnailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another executable, e.g. `magick` on ImageMagick 7.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn command(&self, source: &Path, page: u32, size: u32, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-thumbnail")
            .arg(format!("x{}", size))
            .arg("-background")
            .arg("white")
            .arg("-alpha")
            .arg("remove")
            .arg(format!("{}[{}]", source.display(), page))
            .arg(output)
            .kill_on_drop(true);
        cmd
    }
}

/// Run a command that writes to files, failing on timeout or non-zero exit.
async fn run_cmd_status(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| Error::Thumbnail(format!("command timed out after {}s", timeout_secs)))?
        .map_err(|e| Error::Thumbnail(format!("failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Thumbnail(format!(
            "command failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

#[async_trait]
impl ThumbnailGenerator for ImageMagickThumbnailer {
    async fn generate(&self, source: &Path, page: u32, size: u32, output: &Path) -> Result<()> {
        debug!(
            program = %self.program,
            source = %source.display(),
            page,
            size,
            "Rendering thumbnail"
        );
        run_cmd_status(&mut self.command(source, page, size, output), self.timeout_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_arguments() {
        let thumb = ImageMagickThumbnailer::new();
        let cmd = thumb.command(
            Path::new("/in/scan.pdf"),
            0,
            500,
            Path::new("/out/abc.png"),
        );
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "convert");
        let args: Vec<PathBuf> = std_cmd.get_args().map(PathBuf::from).collect();
        let expected: Vec<PathBuf> = [
            "-thumbnail",
            "x500",
            "-background",
            "white",
            "-alpha",
            "remove",
            "/in/scan.pdf[0]",
            "/out/abc.png",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[tokio::test]
    async fn test_missing_program_is_thumbnail_error() {
        let thumb = ImageMagickThumbnailer::new().with_program("vpaper-no-such-binary");
        let err = thumb
            .generate(Path::new("a.pdf"), 0, 500, Path::new("a.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Thumbnail(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_thumbnail_error() {
        let thumb = ImageMagickThumbnailer::new().with_program("false");
        let err = thumb
            .generate(Path::new("a.pdf"), 0, 500, Path::new("a.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("command failed"));
    }
}
