//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Last stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 40;

/// One input file plus the arguments that precede its `-i`.
#[derive(Debug, Clone)]
struct InputSpec {
    path: PathBuf,
    args: Vec<String>,
}

/// Builder for FFmpeg commands.
///
/// Supports several inputs; `seek`, `duration` and the `input_arg` family
/// apply to the most recently added input.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<InputSpec>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
    threads: u32,
}

impl FfmpegCommand {
    /// Create a command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![InputSpec {
                path: input.as_ref().to_path_buf(),
                args: Vec::new(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
            threads: 0,
        }
    }

    /// Add another input file.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(InputSpec {
            path: path.as_ref().to_path_buf(),
            args: Vec::new(),
        });
        self
    }

    /// Add an argument before the current input's `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(spec) = self.inputs.last_mut() {
            spec.args.push(arg.into());
        }
        self
    }

    /// Add an argument after the inputs (output side).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek the current input (before decoding).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{seconds:.3}"))
    }

    /// Limit the current input's read duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{seconds:.3}"))
    }

    /// Set a simple video filter chain.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set a complex filter graph.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Set the video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set the audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set the encoding preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set the GIF container loop count (0 = forever).
    pub fn gif_loop(self, count: i32) -> Self {
        self.output_arg("-loop").output_arg(count.to_string())
    }

    /// Set the encoder thread count (0 = let the engine decide).
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Set the engine log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Output path this command writes to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the full argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress records interleave with diagnostics on stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        if self.threads > 0 {
            args.push("-threads".to_string());
            args.push(self.threads.to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a command, ignoring progress updates.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run a command, delivering parsed progress records to `on_progress`.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(command = %args.join(" "), "running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr not captured", None, None))?;
        let mut reader = BufReader::new(stderr).lines();

        // Parse progress records and keep a tail of diagnostic lines for
        // error reporting.
        let tail_task = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                match parse_progress_line(&line, &mut current) {
                    ParsedLine::Record(progress) => on_progress(progress),
                    ParsedLine::Field => {}
                    ParsedLine::Diagnostic => {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            }

            tail
        });

        let status = child.wait().await;
        let tail = tail_task.await.unwrap_or_default();
        let status = status?;

        if !status.success() {
            let stderr = (!tail.is_empty()).then(|| tail.into_iter().collect::<Vec<_>>().join("\n"));
            return Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                stderr,
                status.code(),
            ));
        }

        verify_output(cmd.output_path())
    }
}

/// Check that a finished command actually wrote something.
pub(crate) fn verify_output(path: &Path) -> MediaResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(MediaError::EmptyOutput(path.to_path_buf())),
    }
}

enum ParsedLine {
    /// A full progress record is ready.
    Record(FfmpegProgress),
    /// A progress key was consumed.
    Field,
    /// Not part of `-progress` output.
    Diagnostic,
}

/// Parse one stderr line of FFmpeg's `-progress` stream.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ParsedLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ParsedLine::Diagnostic;
    };

    match key {
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "out_time_ms" => {
            // Despite the name this key carries microseconds
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return ParsedLine::Record(current.clone());
        }
        _ => return ParsedLine::Diagnostic,
    }

    ParsedLine::Field
}

fn find_tool(name: &str, missing: MediaError) -> MediaResult<PathBuf> {
    which::which(name).map_err(|_| missing)
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    find_tool("ffmpeg", MediaError::FfmpegNotFound)
}

/// Check if ffprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    find_tool("ffprobe", MediaError::FfprobeNotFound)
}

/// Check if gifsicle is available.
pub fn check_gifsicle() -> MediaResult<PathBuf> {
    find_tool("gifsicle", MediaError::GifsicleNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_input_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.gif")
            .seek(12.5)
            .duration(4.0)
            .video_filter("fps=15")
            .gif_loop(0);

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"12.500".to_string()));
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"4.000".to_string()));
        assert!(args.contains(&"-loop".to_string()));
        assert_eq!(args.last().unwrap(), "out.gif");
    }

    #[test]
    fn test_seek_precedes_input_flag() {
        let cmd = FfmpegCommand::new("in.mp4", "out.gif").seek(3.0);
        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i);
    }

    #[test]
    fn test_multiple_inputs_in_order() {
        let cmd = FfmpegCommand::new("clip.mp4", "out.gif")
            .input("palette.png")
            .filter_complex("[0:v][1:v]paletteuse");

        let args = cmd.build_args();
        let positions: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions.len(), 2);
        assert_eq!(args[positions[0] + 1], "clip.mp4");
        assert_eq!(args[positions[1] + 1], "palette.png");
    }

    #[test]
    fn test_threads_emitted_only_when_set() {
        let args = FfmpegCommand::new("a.mp4", "b.gif").build_args();
        assert!(!args.contains(&"-threads".to_string()));

        let args = FfmpegCommand::new("a.mp4", "b.gif").threads(4).build_args();
        let pos = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[pos + 1], "4");
    }

    #[test]
    fn test_progress_record_assembly() {
        let mut current = FfmpegProgress::default();

        assert!(matches!(
            parse_progress_line("frame=42", &mut current),
            ParsedLine::Field
        ));
        assert!(matches!(
            parse_progress_line("out_time_us=5000000", &mut current),
            ParsedLine::Field
        ));
        assert!(matches!(
            parse_progress_line("speed=1.5x", &mut current),
            ParsedLine::Field
        ));

        let parsed = parse_progress_line("progress=end", &mut current);
        let ParsedLine::Record(record) = parsed else {
            panic!("expected a full record");
        };
        assert_eq!(record.frame, 42);
        assert_eq!(record.out_time_ms, 5000);
        assert!((record.speed - 1.5).abs() < 0.01);
        assert!(record.is_complete);
    }

    #[test]
    fn test_diagnostic_lines_pass_through() {
        let mut current = FfmpegProgress::default();
        assert!(matches!(
            parse_progress_line("Error while decoding stream", &mut current),
            ParsedLine::Diagnostic
        ));
        assert!(matches!(
            parse_progress_line("bitrate=1024.0kbits/s", &mut current),
            ParsedLine::Diagnostic
        ));
    }

    #[test]
    fn test_missing_tool_maps_to_its_error() {
        let err = find_tool("gifclip-no-such-tool", MediaError::GifsicleNotFound).unwrap_err();
        assert!(matches!(err, MediaError::GifsicleNotFound));
    }
}
