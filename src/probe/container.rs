use serde::{Deserialize, Serialize};

/// Structural metadata of one container file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescription {
    pub has_chapters: bool,
    pub tracks: Vec<TrackInfo>,
    pub attachments: Vec<AttachmentInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitles,
    Other,
}

impl TrackKind {
    pub fn from_mkvmerge_type(s: &str) -> Self {
        match s {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            "subtitles" => TrackKind::Subtitles,
            _ => TrackKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: u32,
    pub kind: TrackKind,
    pub codec: String,
    pub codec_id: String,
    pub track_name: Option<String>,
}

impl TrackInfo {
    pub fn is_subtitle(&self) -> bool {
        self.kind == TrackKind::Subtitles
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub id: u32,
    pub file_name: String,
    pub mime_type: String,
}

impl ContainerDescription {
    pub fn subtitle_tracks(&self) -> impl Iterator<Item = &TrackInfo> {
        self.tracks.iter().filter(|t| t.is_subtitle())
    }
}
