//! Static preset registry: montage types, subtitle styles and colors.
//!
//! Everything here is `'static` data. Lookups that take caller input never
//! fail; unknown identifiers resolve to a documented default.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::types::Resolution;

pub const DEFAULT_MONTAGE_TYPE: &str = "tiktok_classic";
pub const STYLE_CLONE: &str = "style_clone";
pub const DEFAULT_SUBTITLE_STYLE: &str = "pop";
pub const DEFAULT_COLOR: &str = "white";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OptionCategory {
    #[serde(skip)]
    pub id: &'static str,
    pub name: &'static str,
    pub options: &'static [&'static str],
    /// Value used when the caller omits the category or picks an illegal
    /// value. `None` means "no selection".
    pub default: Option<&'static str>,
}

impl OptionCategory {
    pub fn allows(&self, value: &str) -> bool {
        self.options.contains(&value)
    }
}

#[derive(Debug, Serialize)]
pub struct MontageType {
    #[serde(skip)]
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    #[serde(serialize_with = "categories_as_map")]
    pub categories: &'static [OptionCategory],
}

impl MontageType {
    pub fn category(&self, id: &str) -> Option<&'static OptionCategory> {
        self.categories.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtitleStyleSpec {
    pub id: &'static str,
    pub font: &'static str,
    pub size: u32,
    pub outline: u32,
    /// ASS override block prefixed verbatim to every dialogue line.
    pub animation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPreset {
    pub id: &'static str,
    /// ASS colour literal, `&HAABBGGRR`.
    pub value: &'static str,
}

/// Vertical placement of subtitles, mapped onto an ASS numpad alignment code
/// and a vertical margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Center,
    Bottom,
    Top,
}

impl Position {
    pub fn alignment(self) -> u8 {
        match self {
            Position::Center => 5,
            Position::Bottom => 2,
            Position::Top => 8,
        }
    }

    pub fn margin_v(self) -> u32 {
        match self {
            Position::Center => 100,
            Position::Bottom | Position::Top => 60,
        }
    }
}

/// The whole montage catalog, serialized as an ordered object keyed by
/// montage id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let types = montage_types();
        let mut map = serializer.serialize_map(Some(types.len()))?;
        for t in types {
            map.serialize_entry(t.id, t)?;
        }
        map.end()
    }
}

fn categories_as_map<S: Serializer>(
    categories: &&'static [OptionCategory],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(categories.len()))?;
    for c in categories.iter() {
        map.serialize_entry(c.id, c)?;
    }
    map.end()
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub fn montage_types() -> &'static [MontageType] {
    MONTAGE_TYPES
}

pub fn montage_type(id: &str) -> Option<&'static MontageType> {
    MONTAGE_TYPES.iter().find(|t| t.id == id)
}

/// Unknown montage types normalize to `tiktok_classic`.
pub fn resolve_montage_type(id: &str) -> Resolution<&'static MontageType> {
    match montage_type(id) {
        Some(t) => Resolution::Matched(t),
        None => Resolution::Defaulted(&MONTAGE_TYPES[0]),
    }
}

pub fn subtitle_styles() -> &'static [SubtitleStyleSpec] {
    SUBTITLE_STYLES
}

/// Unknown style ids resolve to "pop".
pub fn resolve_subtitle_style(id: &str) -> Resolution<&'static SubtitleStyleSpec> {
    match SUBTITLE_STYLES.iter().find(|s| s.id == id) {
        Some(s) => Resolution::Matched(s),
        None => Resolution::Defaulted(&SUBTITLE_STYLES[0]),
    }
}

/// Unknown positions resolve to center.
pub fn resolve_position(id: &str) -> Resolution<Position> {
    match id {
        "center" => Resolution::Matched(Position::Center),
        "bottom" => Resolution::Matched(Position::Bottom),
        "top" => Resolution::Matched(Position::Top),
        _ => Resolution::Defaulted(Position::Center),
    }
}

pub fn colors() -> &'static [ColorPreset] {
    COLORS
}

/// Unknown color ids resolve to "white".
pub fn resolve_color(id: &str) -> Resolution<&'static ColorPreset> {
    match COLORS.iter().find(|c| c.id == id) {
        Some(c) => Resolution::Matched(c),
        None => Resolution::Defaulted(&COLORS[0]),
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

const fn category(
    id: &'static str,
    name: &'static str,
    options: &'static [&'static str],
    default: Option<&'static str>,
) -> OptionCategory {
    OptionCategory {
        id,
        name,
        options,
        default,
    }
}

#[rustfmt::skip]
static MONTAGE_TYPES: &[MontageType] = &[
    MontageType {
        id: "tiktok_classic",
        name: "TikTok Classic",
        emoji: "🎵",
        description: "Talking content, vlogs, face-cam",
        categories: &[
            category("subtitle_style", "Subtitle style", &["pop", "fade", "bounce", "typewriter", "karaoke"], Some("pop")),
            category("position", "Position", &["center", "bottom", "top"], Some("center")),
            category("colors", "Colors", &["white", "yellow", "cyan", "rainbow"], Some("white")),
            category("sfx", "Sound effects", &["whoosh", "ding", "boom", "none"], Some("none")),
            category("rhythm", "Rhythm", &["normal", "fast", "ultracut"], Some("normal")),
        ],
    },
    MontageType {
        id: "tiktok_edit",
        name: "TikTok Edit",
        emoji: "🔥",
        description: "Stylized edits, heavy transitions",
        categories: &[
            category("edit_type", "Edit type", &["anime", "cinematic", "gaming", "aesthetic", "dark"], None),
            category("transitions", "Transitions", &["shake", "zoom_punch", "flash", "glitch", "whip"], None),
            category("video_effects", "Video effects", &["velocity", "blur_motion", "rgb_split", "vhs"], None),
            category("overlay", "Overlay", &["grain", "light_leaks", "dust", "particles", "none"], Some("none")),
            category("beat_sync", "Beat sync", &["auto", "manual", "off"], Some("off")),
        ],
    },
    MontageType {
        id: "story",
        name: "Story / Narration",
        emoji: "📖",
        description: "Reddit stories, news items",
        categories: &[
            category("illustrations", "Illustrations", &["ai_generated", "stock_real", "documentary", "cartoon"], None),
            category("image_frequency", "Image frequency", &["5s", "10s", "15s", "auto"], Some("auto")),
            category("ambiance", "Ambiance", &["mystery", "funny", "dramatic", "horror", "informative"], None),
            category("sfx", "Sound effects", &["ambiance", "suspense", "none"], Some("none")),
            category("voice", "Voice", &["original", "tts"], Some("original")),
        ],
    },
    MontageType {
        id: "youtube",
        name: "YouTube Talking Head",
        emoji: "▶️",
        description: "Classic YouTube videos",
        categories: &[
            category("zooms", "Zooms", &["auto_highlights", "subtle", "intense", "off"], Some("off")),
            category("silence_cut", "Silence cuts", &["aggressive", "normal", "light", "off"], Some("off")),
            category("subtitles", "Subtitles", &["clean", "bold", "none"], Some("clean")),
            category("background_music", "Background music", &["lofi", "upbeat", "none"], Some("none")),
            category("broll", "B-roll", &["auto_suggest", "off"], Some("off")),
        ],
    },
    MontageType {
        id: "podcast",
        name: "Podcast / Interview",
        emoji: "🎙️",
        description: "Podcasts, interviews",
        categories: &[
            category("layout", "Layout", &["solo", "split_screen", "pip"], Some("solo")),
            category("waveform", "Waveform", &["animated", "static", "off"], Some("off")),
            category("subtitles", "Subtitles", &["verbatim", "summary", "off"], Some("verbatim")),
            category("music", "Music", &["intro_outro", "light_bg", "off"], Some("off")),
            category("chapters", "Chapters", &["auto", "off"], Some("off")),
        ],
    },
    MontageType {
        id: "gaming",
        name: "Gaming / Stream",
        emoji: "🎮",
        description: "Gaming clips, highlights",
        categories: &[
            category("overlay", "Overlay", &["minimal", "streamer", "esport", "clean"], Some("clean")),
            category("facecam", "Facecam", &["corner", "large", "off"], Some("off")),
            category("kill_effects", "Kill effects", &["flash", "shake", "slowmo", "sound"], None),
            category("gaming_sfx", "Gaming SFX", &["hitmarker", "mlg", "classic", "off"], Some("off")),
            category("transitions", "Transitions", &["glitch", "swipe", "zoom", "hard_cut"], Some("hard_cut")),
        ],
    },
    MontageType {
        id: "motivation",
        name: "Motivation",
        emoji: "💪",
        description: "Quotes, personal development",
        categories: &[
            category("background", "Background", &["nature", "city", "abstract", "dark", "sport"], None),
            category("typography", "Quote typography", &["impact", "elegant", "handwritten", "bold"], None),
            category("text_effects", "Text effects", &["fade_in", "typewriter", "glitch", "scale"], None),
            category("music", "Music", &["epic_orchestral", "piano", "ambient", "drums"], None),
            category("cinematic", "Cinematic", &["letterbox", "slowmo", "normal"], Some("normal")),
        ],
    },
    MontageType {
        id: "comedy",
        name: "Comedy / Meme",
        emoji: "😂",
        description: "Funny content, memes",
        categories: &[
            category("meme_overlays", "Meme overlays", &["classic", "emojis", "impact_text", "none"], Some("none")),
            category("sfx", "SFX", &["vine_boom", "bruh", "laugh_track", "fart_reverb", "none"], Some("none")),
            category("zoom_chaos", "Zoom chaos", &["random", "face_zoom", "off"], Some("off")),
            category("speed", "Speed", &["random_speed", "normal", "slowmo_fails"], Some("normal")),
            category("effects", "Effects", &["deep_fried", "normal", "vhs"], Some("normal")),
        ],
    },
    MontageType {
        id: "tutorial",
        name: "Tutorial",
        emoji: "📚",
        description: "How-tos, training",
        categories: &[
            category("annotations", "Annotations", &["arrows", "circles", "highlights", "off"], Some("off")),
            category("numbering", "Numbering", &["numbered_steps", "none"], Some("none")),
            category("zoom_focus", "Zoom focus", &["on_action", "on_text", "off"], Some("off")),
            category("music", "Music", &["corporate", "chill", "none"], Some("none")),
            category("cta", "CTA", &["animated_outro", "simple", "off"], Some("off")),
        ],
    },
    MontageType {
        id: "cinematic",
        name: "Cinematic",
        emoji: "🎬",
        description: "Cinema vlogs, travel",
        categories: &[
            category("aspect_ratio", "Aspect ratio", &["16_9", "21_9_letterbox", "4_3_vintage", "1_1"], Some("16_9")),
            category("color_grade", "Color grade", &["warm", "cold", "vintage", "noir", "teal_orange"], None),
            category("slow_motion", "Slow motion", &["auto_highlights", "50_percent", "off"], Some("off")),
            category("transitions", "Transitions", &["fade", "cross_dissolve", "light_leak", "cut"], Some("cut")),
            category("sound_design", "Sound design", &["ambiance", "cinema_score", "minimal"], Some("minimal")),
        ],
    },
    MontageType {
        id: STYLE_CLONE,
        name: "Clone a Style",
        emoji: "🎯",
        description: "Copies the style of a reference video",
        categories: &[
            category("clone_intensity", "Intensity", &["exact", "similar", "inspired"], Some("similar")),
            category("keep_subtitles", "Subtitles", &["clone_style", "my_style", "none"], Some("clone_style")),
            category("keep_colors", "Colors", &["clone", "original", "enhance"], Some("clone")),
            category("keep_rhythm", "Rhythm", &["clone", "faster", "slower"], Some("clone")),
            category("keep_effects", "Effects", &["all", "some", "none"], Some("all")),
        ],
    },
];

// The first entry of each table is its fallback.

static SUBTITLE_STYLES: &[SubtitleStyleSpec] = &[
    SubtitleStyleSpec {
        id: "pop",
        font: "Impact",
        size: 58,
        outline: 5,
        animation: r"{\fscx0\fscy0\t(0,80,\fscx110\fscy110)\t(80,150,\fscx100\fscy100)}",
    },
    SubtitleStyleSpec {
        id: "fade",
        font: "Arial",
        size: 48,
        outline: 3,
        animation: r"{\fad(200,200)}",
    },
    SubtitleStyleSpec {
        id: "bounce",
        font: "Impact",
        size: 54,
        outline: 4,
        animation: r"{\fscx0\fscy0\t(0,100,\fscx120\fscy120)\t(100,200,\fscx95\fscy95)\t(200,300,\fscx100\fscy100)}",
    },
    SubtitleStyleSpec {
        id: "typewriter",
        font: "Courier New",
        size: 44,
        outline: 2,
        animation: r"{\fad(50,0)}",
    },
    SubtitleStyleSpec {
        id: "karaoke",
        font: "Impact",
        size: 52,
        outline: 4,
        animation: r"{\k50}",
    },
    SubtitleStyleSpec {
        id: "clean",
        font: "Arial",
        size: 42,
        outline: 2,
        animation: r"{\fad(150,150)}",
    },
    SubtitleStyleSpec {
        id: "bold",
        font: "Impact",
        size: 64,
        outline: 6,
        animation: r"{\fscx0\fscy0\t(0,100,\fscx100\fscy100)}",
    },
];

static COLORS: &[ColorPreset] = &[
    ColorPreset { id: "white", value: "&H00FFFFFF" },
    ColorPreset { id: "yellow", value: "&H0000FFFF" },
    ColorPreset { id: "cyan", value: "&H00FFFF00" },
    ColorPreset { id: "rainbow", value: "&H00FF00FF" },
    ColorPreset { id: "red", value: "&H000000FF" },
    ColorPreset { id: "green", value: "&H0000FF00" },
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_eleven_types_in_order() {
        let ids: Vec<&str> = montage_types().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 11);
        assert_eq!(ids[0], DEFAULT_MONTAGE_TYPE);
        assert_eq!(ids[9], "cinematic");
        assert_eq!(ids[10], STYLE_CLONE);
    }

    #[test]
    fn every_default_is_a_legal_value() {
        for t in montage_types() {
            for c in t.categories {
                if let Some(d) = c.default {
                    assert!(c.allows(d), "{}.{} default {d} not in options", t.id, c.id);
                }
            }
        }
    }

    #[test]
    fn unknown_style_falls_back_to_pop() {
        let r = resolve_subtitle_style("definitely-not-a-style");
        assert!(r.is_defaulted());
        assert_eq!(r.value().id, DEFAULT_SUBTITLE_STYLE);

        let r = resolve_subtitle_style("karaoke");
        assert!(!r.is_defaulted());
        assert_eq!(r.value().font, "Impact");
        assert_eq!(r.value().animation, r"{\k50}");
    }

    #[test]
    fn unknown_color_falls_back_to_white() {
        let r = resolve_color("ultraviolet");
        assert!(r.is_defaulted());
        assert_eq!(r.value().value, "&H00FFFFFF");
        assert_eq!(resolve_color("cyan").value().value, "&H00FFFF00");
    }

    #[test]
    fn position_table() {
        assert_eq!(resolve_position("center").into_inner().alignment(), 5);
        assert_eq!(resolve_position("center").into_inner().margin_v(), 100);
        assert_eq!(resolve_position("bottom").into_inner().alignment(), 2);
        assert_eq!(resolve_position("bottom").into_inner().margin_v(), 60);
        assert_eq!(resolve_position("top").into_inner().alignment(), 8);
        assert_eq!(resolve_position("top").into_inner().margin_v(), 60);

        let unknown = resolve_position("sideways");
        assert!(unknown.is_defaulted());
        assert_eq!(unknown.into_inner(), Position::Center);
    }

    #[test]
    fn unknown_montage_type_falls_back_to_tiktok_classic() {
        let r = resolve_montage_type("vaporwave");
        assert!(r.is_defaulted());
        assert_eq!(r.value().id, DEFAULT_MONTAGE_TYPE);
        assert!(!resolve_montage_type("comedy").is_defaulted());
    }

    #[test]
    fn catalog_serializes_as_ordered_object() {
        let json = serde_json::to_string(&Catalog).unwrap();
        let classic = json.find(r#""tiktok_classic""#).unwrap();
        let clone = json.find(r#""style_clone""#).unwrap();
        assert!(classic < clone);
        assert!(json.contains(r#""color_grade":{"name":"Color grade""#));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 11);
        assert_eq!(
            value["cinematic"]["categories"]["aspect_ratio"]["options"][1],
            "21_9_letterbox"
        );
    }
}
