use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gstreamer as gst;
use gstreamer_pbutils as gst_pbutils;

/// How long the discoverer may spend on a single file.
const DISCOVERY_TIMEOUT_SECS: u64 = 10;

/// Media properties of a video file, read without decoding it fully.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, 0.0 if the container does not say.
    pub framerate: f64,
    pub duration: Option<Duration>,
}

impl MediaInfo {
    /// Frame count derived from duration and framerate.
    pub fn frame_count(&self) -> Option<u64> {
        let duration = self.duration?;
        if self.framerate <= 0.0 || duration.is_zero() {
            return None;
        }
        Some((duration.as_secs_f64() * self.framerate).round() as u64)
    }
}

/// Discovers resolution, framerate and duration of the first video stream.
pub fn discover(path: &Path) -> anyhow::Result<MediaInfo> {
    let path = path
        .canonicalize()
        .with_context(|| format!("resolving {}", path.display()))?;
    let uri = gst::glib::filename_to_uri(&path, None)
        .with_context(|| format!("building uri for {}", path.display()))?;

    let discoverer =
        gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(DISCOVERY_TIMEOUT_SECS))?;
    let info = discoverer
        .discover_uri(&uri)
        .with_context(|| format!("discovering {uri}"))?;

    let video = info
        .video_streams()
        .into_iter()
        .next()
        .with_context(|| format!("no video stream in {}", path.display()))?;

    let fps = video.framerate();
    let framerate = if fps.denom() > 0 {
        fps.numer() as f64 / fps.denom() as f64
    } else {
        0.0
    };

    Ok(MediaInfo {
        width: video.width(),
        height: video.height(),
        framerate,
        duration: info
            .duration()
            .map(|d| Duration::from_nanos(d.nseconds())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(framerate: f64, duration: Option<Duration>) -> MediaInfo {
        MediaInfo {
            width: 1920,
            height: 1080,
            framerate,
            duration,
        }
    }

    #[test]
    fn test_frame_count_from_duration() {
        let i = info(30.0, Some(Duration::from_secs(10)));
        assert_eq!(i.frame_count(), Some(300));
    }

    #[test]
    fn test_frame_count_rounds_ntsc_rate() {
        let i = info(30000.0 / 1001.0, Some(Duration::from_millis(10_010)));
        assert_eq!(i.frame_count(), Some(300));
    }

    #[test]
    fn test_frame_count_unknown() {
        assert_eq!(info(0.0, Some(Duration::from_secs(1))).frame_count(), None);
        assert_eq!(info(25.0, None).frame_count(), None);
        assert_eq!(info(25.0, Some(Duration::ZERO)).frame_count(), None);
    }
}
