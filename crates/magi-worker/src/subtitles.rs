//! SRT subtitle generation.
//!
//! One entry per narration chunk, windows laid out cumulatively in
//! playback order. Only scenes that made it into the final video are
//! passed in, so subtitle text never references a scene the assembler
//! dropped.

use std::path::Path;

use magi_models::NarrationChunk;
use tracing::info;

use crate::error::WorkerResult;

/// Shortest display time for a single entry.
const MIN_ENTRY_SECS: f64 = 2.0;

/// `HH:MM:SS,mmm` as SRT wants it.
pub fn format_srt_time(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0) as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Render SRT entries for the given scenes' chunks, in the order given.
///
/// Callers pass the chunk lists of successful scenes in ascending
/// scene-index order; windows accumulate across scene boundaries.
pub fn build_srt<'a, I>(scenes: I) -> String
where
    I: IntoIterator<Item = &'a [NarrationChunk]>,
{
    let mut out = String::new();
    let mut counter = 0usize;
    let mut current = 0.0_f64;

    for chunks in scenes {
        for chunk in chunks {
            counter += 1;
            let duration = chunk.estimated_duration_secs.max(MIN_ENTRY_SECS);
            let end = current + duration;
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                counter,
                format_srt_time(current),
                format_srt_time(end),
                chunk.text
            ));
            current = end;
        }
    }
    out
}

/// Write subtitles for the given scenes to `path`.
pub async fn write_subtitles<'a, I>(scenes: I, path: &Path) -> WorkerResult<()>
where
    I: IntoIterator<Item = &'a [NarrationChunk]>,
{
    let srt = build_srt(scenes);
    let entries = srt.matches(" --> ").count();
    tokio::fs::write(path, srt).await?;
    info!(path = %path.display(), entries, "Wrote subtitles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(2.5), "00:00:02,500");
        assert_eq!(format_srt_time(61.25), "00:01:01,250");
        assert_eq!(format_srt_time(3661.0), "01:01:01,000");
    }

    #[test]
    fn test_windows_accumulate_across_scenes() {
        let scene_a = vec![
            NarrationChunk::new("First chunk.", 4.0, false),
            NarrationChunk::new("Second chunk.", 3.0, true),
        ];
        let scene_b = vec![NarrationChunk::new("Third chunk.", 2.5, false)];

        let srt = build_srt([scene_a.as_slice(), scene_b.as_slice()]);

        let expected = "1\n00:00:00,000 --> 00:00:04,000\nFirst chunk.\n\n\
                        2\n00:00:04,000 --> 00:00:07,000\nSecond chunk.\n\n\
                        3\n00:00:07,000 --> 00:00:09,500\nThird chunk.\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_short_chunk_gets_minimum_display_time() {
        let scene = vec![NarrationChunk::new("Hi.", 0.4, false)];
        let srt = build_srt([scene.as_slice()]);
        assert!(srt.contains("00:00:00,000 --> 00:00:02,000"));
    }

    #[test]
    fn test_no_scenes_yields_empty_srt() {
        assert_eq!(build_srt(std::iter::empty::<&[NarrationChunk]>()), "");
    }

    #[tokio::test]
    async fn test_write_subtitles_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");
        let scene = vec![NarrationChunk::new("Some narration here.", 3.0, false)];

        write_subtitles([scene.as_slice()], &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1\n00:00:00,000 --> 00:00:03,000"));
        assert!(written.contains("Some narration here."));
    }
}
