use crate::error::ProbeError;
use crate::probe::container::{AttachmentInfo, ContainerDescription, TrackInfo, TrackKind};
use crate::probe::MetadataProbe;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Deserialize)]
struct Identification {
    #[serde(default)]
    chapters: Vec<serde_json::Value>,
    #[serde(default)]
    tracks: Vec<RawTrack>,
    #[serde(default)]
    attachments: Vec<RawAttachment>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: RawTrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrackProperties {
    codec_id: Option<String>,
    track_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    id: u32,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    content_type: String,
}

/// Parse the JSON printed by `mkvmerge -J`.
pub fn parse_identification(json_str: &str) -> Result<ContainerDescription, ProbeError> {
    let identification: Identification = serde_json::from_str(json_str)
        .map_err(|e| ProbeError::MalformedOutput(e.to_string()))?;

    let tracks = identification
        .tracks
        .into_iter()
        .map(|track| TrackInfo {
            id: track.id,
            kind: TrackKind::from_mkvmerge_type(&track.kind),
            codec: track.codec,
            codec_id: track.properties.codec_id.unwrap_or_default(),
            track_name: track.properties.track_name.filter(|name| !name.is_empty()),
        })
        .collect();

    let attachments = identification
        .attachments
        .into_iter()
        .map(|attachment| AttachmentInfo {
            id: attachment.id,
            file_name: attachment.file_name,
            mime_type: attachment.content_type,
        })
        .collect();

    Ok(ContainerDescription {
        has_chapters: !identification.chapters.is_empty(),
        tracks,
        attachments,
    })
}

pub struct MkvmergeProbe {
    mkvmerge_path: PathBuf,
}

impl MkvmergeProbe {
    pub fn new<P: Into<PathBuf>>(mkvmerge_path: P) -> Self {
        Self {
            mkvmerge_path: mkvmerge_path.into(),
        }
    }
}

impl MetadataProbe for MkvmergeProbe {
    fn probe(&self, file_path: &Path) -> Result<ContainerDescription, ProbeError> {
        tracing::debug!(
            "Running {} -J {}",
            self.mkvmerge_path.display(),
            file_path.display()
        );

        let output = Command::new(&self.mkvmerge_path)
            .arg("-J")
            .arg(file_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(ProbeError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // mkvmerge -J reports its errors inside the JSON on stdout
            let stderr = if stderr.is_empty() {
                stdout.trim().to_string()
            } else {
                stderr
            };

            return Err(ProbeError::ToolFailure {
                exit_code: output.status.code(),
                stderr,
            });
        }

        parse_identification(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "attachments": [
            {"content_type": "application/x-truetype-font", "file_name": "Arial.ttf", "id": 1, "size": 10},
            {"content_type": "image/jpeg", "file_name": "cover.jpg", "id": 2, "size": 20}
        ],
        "chapters": [{"num_entries": 6}],
        "container": {"recognized": true, "supported": true, "type": "Matroska"},
        "tracks": [
            {"codec": "AVC/H.264/MPEG-4p10", "id": 0, "type": "video", "properties": {"codec_id": "V_MPEG4/ISO/AVC"}},
            {"codec": "AAC", "id": 1, "type": "audio", "properties": {"codec_id": "A_AAC", "track_name": ""}},
            {"codec": "SubStationAlpha", "id": 2, "type": "subtitles", "properties": {"codec_id": "S_TEXT/ASS", "track_name": "Signs & Songs"}}
        ]
    }"#;

    #[test]
    fn test_parse_identification() {
        let description = parse_identification(SAMPLE).unwrap();

        assert!(description.has_chapters);
        assert_eq!(description.tracks.len(), 3);
        assert_eq!(description.tracks[1].track_name, None);

        let subtitle = &description.tracks[2];
        assert_eq!(subtitle.kind, TrackKind::Subtitles);
        assert_eq!(subtitle.codec, "SubStationAlpha");
        assert_eq!(subtitle.codec_id, "S_TEXT/ASS");
        assert_eq!(subtitle.track_name.as_deref(), Some("Signs & Songs"));

        assert_eq!(description.attachments.len(), 2);
        assert_eq!(description.attachments[0].file_name, "Arial.ttf");
        assert_eq!(
            description.attachments[0].mime_type,
            "application/x-truetype-font"
        );
    }

    #[test]
    fn test_parse_minimal_identification() {
        let description = parse_identification(r#"{"container": {"recognized": true}}"#).unwrap();
        assert_eq!(description, ContainerDescription::default());

        let description = parse_identification(r#"{"chapters": []}"#).unwrap();
        assert!(!description.has_chapters);
    }

    #[test]
    fn test_parse_malformed_output() {
        let result = parse_identification("mkvmerge v80.0 ('Roundabout')");
        assert!(matches!(result, Err(ProbeError::MalformedOutput(_))));

        let result = parse_identification(r#"{"tracks": [{"type": "video"}]}"#);
        assert!(matches!(result, Err(ProbeError::MalformedOutput(_))));
    }

    #[test]
    fn test_missing_mkvmerge_is_spawn_error() {
        let probe = MkvmergeProbe::new("/nonexistent/bin/mkvmerge");
        let result = probe.probe(Path::new("episode.mkv"));
        assert!(matches!(result, Err(ProbeError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_tool_failure() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let script = temp_dir.path().join("mkvmerge");
        std::fs::write(&script, "#!/bin/sh\necho 'not a container' >&2\nexit 2\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = MkvmergeProbe::new(&script);
        match probe.probe(Path::new("episode.mkv")) {
            Err(ProbeError::ToolFailure { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(stderr, "not a container");
            }
            other => panic!("unexpected probe result: {:?}", other),
        }
    }
}
