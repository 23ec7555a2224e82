//! Builders for every engine invocation the pipeline makes.
//!
//! Builders are pure: they only assemble arguments, so the exact command
//! lines can be tested without running ffmpeg.

use std::path::{Path, PathBuf};

use super::MediaCommand;
use crate::models::EncodeProfile;

/// Format seconds as `HH:MM:SS.mmm`. Negative input clamps to zero.
pub fn secs_to_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms / 60_000) % 60;
    let whole_secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, whole_secs, ms)
}

/// Parse `HH:MM:SS.mmm` (or plain seconds) back to seconds.
pub fn timestamp_to_secs(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => {
            let h: f64 = h.parse().ok()?;
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.parse().ok()?;
            Some(h * 3600.0 + m * 60.0 + s)
        }
        [s] => s.parse().ok(),
        _ => None,
    }
}

/// Demux a source's audio to mono 16-bit PCM WAV at `sample_rate`.
pub fn extract_audio(source: &Path, output: &Path, sample_rate: u32) -> MediaCommand {
    MediaCommand::new(output)
        .arg("-y")
        .arg("-i")
        .path_arg(source)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg(sample_rate.to_string())
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-f")
        .arg("wav")
        .with_output_arg()
}

/// Transcode an audio file to headerless mono `s16le`.
pub fn audio_to_pcm(audio: &Path, output: &Path) -> MediaCommand {
    MediaCommand::new(output)
        .arg("-y")
        .arg("-i")
        .path_arg(audio)
        .arg("-ac")
        .arg("1")
        .arg("-f")
        .arg("s16le")
        .arg("-acodec")
        .arg("pcm_s16le")
        .with_output_arg()
}

/// `afade` filter for a linear fade-in at 0 and a fade-out ending at `duration_secs`.
///
/// Fades are clamped to half the track so they never overlap.
pub fn fade_filter(duration_secs: f64, fade_secs: f64) -> String {
    let fade = fade_secs.min(duration_secs / 2.0).max(0.0);
    let out_start = (duration_secs - fade).max(0.0);
    format!(
        "afade=t=in:st=0:d={:.3},afade=t=out:st={:.3}:d={:.3}",
        fade, out_start, fade
    )
}

/// Apply fade-in/out to one audio track.
pub fn fade_in_out(
    audio: &Path,
    output: &Path,
    duration_secs: f64,
    fade_secs: f64,
) -> MediaCommand {
    MediaCommand::new(output)
        .arg("-y")
        .arg("-i")
        .path_arg(audio)
        .arg("-af")
        .arg(fade_filter(duration_secs, fade_secs))
        .with_output_arg()
}

/// One input to [`merge_audio`].
#[derive(Debug, Clone, PartialEq)]
pub struct MixInput {
    pub path: PathBuf,
    /// Global start offset of this track.
    pub delay_secs: f64,
    pub sample_rate: u32,
}

/// `filter_complex` graph delaying each input and mixing to the longest.
///
/// Delays are given in samples since `adelay` does not accept fractional
/// seconds on every build.
pub fn merge_filter(inputs: &[MixInput]) -> String {
    let delays: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| {
            let delay_samples = (input.delay_secs.max(0.0) * input.sample_rate as f64).floor() as u64;
            format!("[{idx}]adelay=delays={delay_samples}S:all=1[s{idx}]")
        })
        .collect();

    let mix_inputs: String = (0..inputs.len()).map(|i| format!("[s{i}]")).collect();

    format!(
        "{};{}amix=inputs={}:duration=longest[mixout]",
        delays.join(";"),
        mix_inputs,
        inputs.len()
    )
}

/// Mix delay-aligned tracks into one.
pub fn merge_audio(inputs: &[MixInput], output: &Path) -> MediaCommand {
    let mut cmd = MediaCommand::new(output).arg("-y");
    for input in inputs {
        cmd = cmd.arg("-i").path_arg(&input.path);
    }
    cmd.arg("-filter_complex")
        .arg(merge_filter(inputs))
        .arg("-map")
        .arg("[mixout]")
        .with_output_arg()
}

/// Mux an audio track onto a video, stream-copying the video.
pub fn overlay_audio(video: &Path, audio: &Path, output: &Path) -> MediaCommand {
    MediaCommand::new(output)
        .arg("-y")
        .arg("-i")
        .path_arg(video)
        .arg("-i")
        .path_arg(audio)
        .arg("-c:v")
        .arg("copy")
        .arg("-map")
        .arg("0:v")
        .arg("-map")
        .arg("1:a")
        .with_output_arg()
}

/// Video filter normalizing any source to the profile's frame size and rate.
pub fn normalize_filter(profile: &EncodeProfile) -> String {
    let (w, h) = (profile.width, profile.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={:.6}",
        profile.fps
    )
}

/// Re-encode `duration_secs` of `source` starting at `start_secs`.
pub fn subclip(
    source: &Path,
    output: &Path,
    start_secs: f64,
    duration_secs: f64,
    profile: &EncodeProfile,
) -> MediaCommand {
    let mut cmd = MediaCommand::new(output)
        .arg("-y")
        .arg("-ss")
        .arg(secs_to_timestamp(start_secs))
        .arg("-i")
        .path_arg(source)
        .arg("-t")
        .arg(secs_to_timestamp(duration_secs));

    if profile.exclude_audio {
        cmd = cmd.arg("-an");
    }

    cmd.arg("-vf")
        .arg(normalize_filter(profile))
        .arg("-c:v")
        .arg(profile.codec.clone())
        .arg("-preset")
        .arg(profile.preset.as_str())
        .arg("-pix_fmt")
        .arg(profile.pixel_format.clone())
        .with_output_arg()
}

/// Contents of a concat-demuxer list file.
pub fn concat_list_contents(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join clips sharing one encode profile without re-encoding.
pub fn concat(list_file: &Path, output: &Path) -> MediaCommand {
    MediaCommand::new(output)
        .arg("-y")
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .path_arg(list_file)
        .arg("-c")
        .arg("copy")
        .with_output_arg()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_carry_rounded_milliseconds() {
        assert_eq!(secs_to_timestamp(0.0), "00:00:00.000");
        assert_eq!(secs_to_timestamp(4.5), "00:00:04.500");
        assert_eq!(secs_to_timestamp(3661.25), "01:01:01.250");
        assert_eq!(secs_to_timestamp(59.9996), "00:01:00.000");
        assert_eq!(secs_to_timestamp(-2.0), "00:00:00.000");
    }

    #[test]
    fn timestamp_parses_back() {
        let secs = timestamp_to_secs("01:01:01.250").unwrap();
        assert!((secs - 3661.25).abs() < 1e-9);
        assert_eq!(timestamp_to_secs("4.5"), Some(4.5));
        assert_eq!(timestamp_to_secs("a:b"), None);
    }

    #[test]
    fn fade_filter_ends_at_track_end() {
        assert_eq!(
            fade_filter(10.0, 1.0),
            "afade=t=in:st=0:d=1.000,afade=t=out:st=9.000:d=1.000"
        );
    }

    #[test]
    fn fade_filter_clamps_short_tracks() {
        assert_eq!(
            fade_filter(1.0, 1.0),
            "afade=t=in:st=0:d=0.500,afade=t=out:st=0.500:d=0.500"
        );
    }

    #[test]
    fn merge_filter_delays_in_samples() {
        let inputs = vec![
            MixInput {
                path: PathBuf::from("a.wav"),
                delay_secs: 10.0,
                sample_rate: 44100,
            },
            MixInput {
                path: PathBuf::from("b.wav"),
                delay_secs: 0.0,
                sample_rate: 44100,
            },
        ];

        assert_eq!(
            merge_filter(&inputs),
            "[0]adelay=delays=441000S:all=1[s0];[1]adelay=delays=0S:all=1[s1];[s0][s1]amix=inputs=2:duration=longest[mixout]"
        );
    }

    #[test]
    fn subclip_is_silent_reencode() {
        let profile = EncodeProfile::default();
        let cmd = subclip(
            Path::new("/clips/a.mov"),
            Path::new("/tmp/sub_0.mov"),
            12.25,
            4.75,
            &profile,
        );

        assert_eq!(cmd.value_of("-ss"), Some("00:00:12.250"));
        assert_eq!(cmd.value_of("-t"), Some("00:00:04.750"));
        assert_eq!(cmd.value_of("-c:v"), Some("libx264"));
        assert_eq!(cmd.value_of("-preset"), Some("medium"));
        assert!(cmd.args.iter().any(|a| a == "-an"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tmp/sub_0.mov"));
    }

    #[test]
    fn concat_list_escapes_quotes() {
        let contents = concat_list_contents(&[PathBuf::from("/a/b.mov"), PathBuf::from("/it's.mov")]);
        assert_eq!(contents, "file '/a/b.mov'\nfile '/it'\\''s.mov'");
    }

    #[test]
    fn overlay_copies_video_stream() {
        let cmd = overlay_audio(Path::new("v.mov"), Path::new("a.wav"), Path::new("out.mov"));
        assert_eq!(cmd.value_of("-c:v"), Some("copy"));
        assert_eq!(cmd.output, PathBuf::from("out.mov"));
    }
}
