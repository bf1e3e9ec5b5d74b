//! ffmpeg `-vf` chain construction.
//!
//! `build` is a pure function of its inputs: the subtitle burn-in stage is
//! always first, followed by the visual stages the montage type's dispatch
//! table selects for the validated options.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::options::ValidatedOptions;
use crate::types::{FeatureFlags, VideoInfo};

/// Color adjustments taken from a cloned reference video. 1.0 is neutral.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ColorAdjust {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
}

impl ColorAdjust {
    pub const NEUTRAL: Self = Self {
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
    };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for ColorAdjust {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum StageTemplate {
    Literal(&'static str),
    /// Black bars top and bottom, each `fraction` of the frame height.
    Letterbox { fraction: f64 },
}

struct VisualRule {
    montage_type: &'static str,
    category: &'static str,
    value: &'static str,
    stages: &'static [StageTemplate],
}

const VHS_NOISE: StageTemplate = StageTemplate::Literal("noise=alls=20:allf=t+u");

static VISUAL_RULES: &[VisualRule] = &[
    VisualRule {
        montage_type: "tiktok_edit",
        category: "video_effects",
        value: "vhs",
        stages: &[VHS_NOISE],
    },
    VisualRule {
        montage_type: "tiktok_edit",
        category: "video_effects",
        value: "rgb_split",
        stages: &[StageTemplate::Literal("rgbashift=rh=-3:bh=3")],
    },
    VisualRule {
        montage_type: "tiktok_edit",
        category: "overlay",
        value: "grain",
        stages: &[StageTemplate::Literal("noise=alls=10:allf=t")],
    },
    VisualRule {
        montage_type: "cinematic",
        category: "color_grade",
        value: "warm",
        stages: &[StageTemplate::Literal("colorbalance=rs=.1:gs=0:bs=-.1")],
    },
    VisualRule {
        montage_type: "cinematic",
        category: "color_grade",
        value: "cold",
        stages: &[StageTemplate::Literal("colorbalance=rs=-.1:gs=0:bs=.1")],
    },
    VisualRule {
        montage_type: "cinematic",
        category: "color_grade",
        value: "vintage",
        stages: &[StageTemplate::Literal("curves=vintage")],
    },
    VisualRule {
        montage_type: "cinematic",
        category: "color_grade",
        value: "teal_orange",
        stages: &[StageTemplate::Literal(
            "colorbalance=rs=.1:gs=-.05:bs=-.1:rm=-.1:gm=.05:bm=.1",
        )],
    },
    VisualRule {
        montage_type: "cinematic",
        category: "aspect_ratio",
        value: "21_9_letterbox",
        stages: &[StageTemplate::Letterbox { fraction: 0.12 }],
    },
    VisualRule {
        montage_type: "comedy",
        category: "effects",
        value: "deep_fried",
        stages: &[
            StageTemplate::Literal("eq=saturation=3:contrast=1.5"),
            StageTemplate::Literal("noise=alls=30:allf=t"),
        ],
    },
    VisualRule {
        montage_type: "comedy",
        category: "effects",
        value: "vhs",
        stages: &[VHS_NOISE],
    },
    VisualRule {
        montage_type: "motivation",
        category: "cinematic",
        value: "letterbox",
        stages: &[StageTemplate::Letterbox { fraction: 0.1 }],
    },
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the ordered filter stages for one render.
///
/// `clone_colors` is the color profile of a cloned style, if the request uses
/// one; it replaces the montage type's own visual stages.
pub fn build(
    options: &ValidatedOptions,
    video: &VideoInfo,
    subtitle_path: &Path,
    features: FeatureFlags,
    clone_colors: Option<ColorAdjust>,
) -> Vec<String> {
    let mut stages = vec![subtitle_stage(subtitle_path)];

    if !features.visual_filters {
        return stages;
    }

    if let Some(adjust) = clone_colors.filter(|_| features.style_clone) {
        if !adjust.is_neutral() {
            stages.push(format!(
                "eq=brightness={}:contrast={}:saturation={}",
                adjust.brightness - 1.0,
                adjust.contrast,
                adjust.saturation
            ));
        }
        return stages;
    }

    let montage_type = options.montage_type.id;
    for rule in VISUAL_RULES
        .iter()
        .filter(|r| r.montage_type == montage_type)
        .filter(|r| options.get(r.category) == Some(r.value))
    {
        for template in rule.stages {
            expand(template, video, &mut stages);
        }
    }

    stages
}

/// Join stages with the filter-chain separator. An empty chain becomes the
/// pass-through `null` filter.
pub fn join_chain(stages: &[String]) -> String {
    if stages.is_empty() {
        "null".to_string()
    } else {
        stages.join(",")
    }
}

/// The `ass=` burn-in stage for `path`.
pub fn subtitle_stage(path: &Path) -> String {
    format!("ass={}", escape_filter_path(&path.to_string_lossy()))
}

/// Escape a path for use as a filter option value. Backslash separators are
/// normalized to `/` first so Windows paths survive.
pub fn escape_filter_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        match c {
            '\\' => out.push('/'),
            ':' | '\'' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn expand(template: &StageTemplate, video: &VideoInfo, stages: &mut Vec<String>) {
    match *template {
        StageTemplate::Literal(s) => stages.push(s.to_string()),
        StageTemplate::Letterbox { fraction } => {
            let bar = (video.height as f64 * fraction) as u32;
            stages.push(format!("drawbox=x=0:y=0:w=iw:h={bar}:c=black:t=fill"));
            stages.push(format!("drawbox=x=0:y=ih-{bar}:w=iw:h={bar}:c=black:t=fill"));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
