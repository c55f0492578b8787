use crate::probe::{AttachmentInfo, ContainerDescription, TrackInfo};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

const FONT_MIME_TYPES: &[&str] = &[
    "font",
    "application/x-truetype-font",
    "application/x-font-ttf",
    "application/vnd.ms-opentype",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Chapters,
    SubtitleTrack,
    FontAttachment,
}

/// One planned output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionTarget {
    pub kind: TargetKind,
    pub source_id: Option<u32>,
    pub destination: PathBuf,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum PlanWarning {
    /// No classification rule matched; the track is written as `.sub`.
    UnknownSubtitleCodec {
        track_id: u32,
        codec: String,
        codec_id: String,
    },
    /// Several attachments share a file name; the last one extracted wins.
    DuplicateFontName { file_name: String },
    /// The attachment name is used as is but is not a bare file name, so the
    /// font lands outside the `fonts` directory.
    FontNameOutsideFontsDir { file_name: String },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::UnknownSubtitleCodec {
                track_id,
                codec,
                codec_id,
            } => write!(
                f,
                "Unknown subtitle codec: {}, codec id: {} (track {}). Defaulting to .sub",
                codec, codec_id, track_id
            ),
            PlanWarning::DuplicateFontName { file_name } => write!(
                f,
                "Several font attachments are named {}; only the last one is kept",
                file_name
            ),
            PlanWarning::FontNameOutsideFontsDir { file_name } => write!(
                f,
                "Font attachment name {} is not a plain file name; it is written outside the fonts directory",
                file_name
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub targets: Vec<ExtractionTarget>,
    pub warnings: Vec<PlanWarning>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.label.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Ass,
    Srt,
    VobSub,
    Pgs,
    DvbSub,
    Unknown,
}

impl SubtitleFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::VobSub => "idx",
            SubtitleFormat::Pgs => "sup",
            SubtitleFormat::DvbSub => "dvbsub",
            SubtitleFormat::Unknown => "sub",
        }
    }
}

const SUBTITLE_RULES: &[(&[&str], SubtitleFormat)] = &[
    (&["ass", "ssa", "substationalpha"], SubtitleFormat::Ass),
    (&["srt", "subrip"], SubtitleFormat::Srt),
    (&["vobsub"], SubtitleFormat::VobSub),
    (&["pgs", "hdmv_pgs"], SubtitleFormat::Pgs),
    (&["dvbsub"], SubtitleFormat::DvbSub),
];

/// Classify a subtitle track by codec name, falling back to the codec id.
///
/// Rules are tried in order and the first match wins. Within a rule the codec
/// name is checked before the codec id.
pub fn classify_subtitle(codec: &str, codec_id: &str) -> SubtitleFormat {
    let codec = codec.to_lowercase();
    let codec_id = codec_id.to_lowercase();

    SUBTITLE_RULES
        .iter()
        .find(|(tokens, _)| {
            tokens.iter().any(|token| codec.contains(token))
                || tokens.iter().any(|token| codec_id.contains(token))
        })
        .map(|(_, format)| *format)
        .unwrap_or(SubtitleFormat::Unknown)
}

pub fn is_font_attachment(attachment: &AttachmentInfo) -> bool {
    let mime_type = attachment.mime_type.to_lowercase();
    FONT_MIME_TYPES.iter().any(|font| mime_type.contains(font))
}

/// Decide what to extract from one file. Pure: no I/O and never fails.
pub fn plan(description: &ContainerDescription, file_stem: &str, output_root: &Path) -> Plan {
    let mut plan = Plan::default();

    if description.has_chapters {
        plan.targets.push(ExtractionTarget {
            kind: TargetKind::Chapters,
            source_id: None,
            destination: output_root
                .join("chapters")
                .join(format!("{}_chapters.xml", file_stem)),
            label: "Chapters".to_string(),
        });
    }

    for track in description.subtitle_tracks() {
        plan.targets
            .push(subtitle_target(track, file_stem, output_root, &mut plan.warnings));
    }

    let mut seen_fonts = HashSet::new();
    for attachment in description.attachments.iter().filter(|a| is_font_attachment(a)) {
        if !seen_fonts.insert(attachment.file_name.as_str()) {
            plan.warnings.push(PlanWarning::DuplicateFontName {
                file_name: attachment.file_name.clone(),
            });
        }
        if !is_plain_file_name(&attachment.file_name) {
            plan.warnings.push(PlanWarning::FontNameOutsideFontsDir {
                file_name: attachment.file_name.clone(),
            });
        }

        plan.targets.push(ExtractionTarget {
            kind: TargetKind::FontAttachment,
            source_id: Some(attachment.id),
            destination: output_root.join("fonts").join(&attachment.file_name),
            label: format!("Font ({})", attachment.file_name),
        });
    }

    plan
}

fn subtitle_target(
    track: &TrackInfo,
    file_stem: &str,
    output_root: &Path,
    warnings: &mut Vec<PlanWarning>,
) -> ExtractionTarget {
    let format = classify_subtitle(&track.codec, &track.codec_id);
    if format == SubtitleFormat::Unknown {
        warnings.push(PlanWarning::UnknownSubtitleCodec {
            track_id: track.id,
            codec: track.codec.clone(),
            codec_id: track.codec_id.clone(),
        });
    }

    let ext = format.extension();
    let suffix = track
        .track_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(|name| format!("[{}]", sanitize_track_name(name)))
        .unwrap_or_default();

    ExtractionTarget {
        kind: TargetKind::SubtitleTrack,
        source_id: Some(track.id),
        destination: output_root
            .join("subs")
            .join(format!("{}_track{}{}.{}", file_stem, track.id, suffix, ext)),
        label: format!("Subtitle ({}, {})", track.codec, ext),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Replace characters that would change the directory of the subtitle file or
/// that Windows refuses in file names.
fn sanitize_track_name(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
