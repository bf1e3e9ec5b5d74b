//! Boundary validation of caller-supplied montage options.
//!
//! Raw options arrive as a JSON object of free-form strings. They are checked
//! once against the selected montage type; downstream code only ever sees
//! catalog values.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::catalog::{
    self, ColorPreset, MontageType, Position, SubtitleStyleSpec, DEFAULT_SUBTITLE_STYLE,
};
use crate::types::Resolution;

/// Parse the raw options payload. Anything that is not a JSON object
/// degrades to an empty mapping.
pub fn parse_options_json(raw: &str) -> Resolution<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Resolution::Matched(map),
        _ => Resolution::Defaulted(Map::new()),
    }
}

/// A supplied value that was replaced during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub key: String,
    pub supplied: Option<String>,
    pub applied: Option<String>,
}

/// Resolved subtitle look shared by every montage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtitleSelection {
    pub style: &'static SubtitleStyleSpec,
    pub position: Position,
    pub color: &'static ColorPreset,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedOptions {
    #[serde(serialize_with = "montage_id")]
    pub montage_type: &'static MontageType,
    values: BTreeMap<&'static str, &'static str>,
    pub subtitle: SubtitleSelection,
}

fn montage_id<S: serde::Serializer>(
    t: &&'static MontageType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(t.id)
}

#[derive(Debug, Clone)]
pub struct Validation {
    pub options: ValidatedOptions,
    pub normalized: Vec<Normalized>,
}

impl ValidatedOptions {
    /// Validate `raw` against `montage_type`.
    ///
    /// Categories the caller omitted or filled with an illegal value take the
    /// category default. Keys that are not categories of the montage type are
    /// ignored, except the subtitle keys (`subtitle_style`, `subtitles`,
    /// `position`, `colors`) which apply to every montage type.
    pub fn validate(montage_type: &'static MontageType, raw: &Map<String, Value>) -> Validation {
        let mut values = BTreeMap::new();
        let mut normalized = Vec::new();

        for category in montage_type.categories {
            let supplied = raw.get(category.id).map(value_to_string);
            let chosen = match supplied.as_deref() {
                Some(v) if category.allows(v) => {
                    category.options.iter().copied().find(|o| *o == v)
                }
                _ => category.default,
            };
            if supplied.is_some() && supplied.as_deref() != chosen {
                normalized.push(Normalized {
                    key: category.id.to_string(),
                    supplied: supplied.clone(),
                    applied: chosen.map(str::to_string),
                });
            }
            if let Some(v) = chosen {
                values.insert(category.id, v);
            }
        }

        // Only keys the caller supplied feed the subtitle selection; category
        // defaults never override the catalog-wide subtitle defaults.
        let pick = |key: &str| -> Option<String> {
            let supplied = raw.get(key)?;
            Some(
                values
                    .get(key)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| value_to_string(supplied)),
            )
        };

        let style_id = pick("subtitle_style")
            .or_else(|| pick("subtitles"))
            .unwrap_or_else(|| DEFAULT_SUBTITLE_STYLE.to_string());
        let style = catalog::resolve_subtitle_style(&style_id);
        record(&mut normalized, "subtitle_style", &style_id, &style, |s| s.id);

        let position_id = pick("position");
        let position = catalog::resolve_position(position_id.as_deref().unwrap_or("center"));
        if let Some(id) = &position_id {
            record(&mut normalized, "position", id, &position, |p| match p {
                Position::Center => "center",
                Position::Bottom => "bottom",
                Position::Top => "top",
            });
        }

        let color_id = pick("colors");
        let color = catalog::resolve_color(color_id.as_deref().unwrap_or(catalog::DEFAULT_COLOR));
        if let Some(id) = &color_id {
            record(&mut normalized, "colors", id, &color, |c| c.id);
        }

        Validation {
            options: ValidatedOptions {
                montage_type,
                values,
                subtitle: SubtitleSelection {
                    style: style.into_inner(),
                    position: position.into_inner(),
                    color: color.into_inner(),
                },
            },
            normalized,
        }
    }

    pub fn get(&self, category: &str) -> Option<&'static str> {
        self.values.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

fn record<T>(
    normalized: &mut Vec<Normalized>,
    key: &str,
    supplied: &str,
    resolution: &Resolution<T>,
    id_of: impl Fn(&T) -> &'static str,
) {
    if resolution.is_defaulted() && !normalized.iter().any(|n| n.key == key) {
        normalized.push(Normalized {
            key: key.to_string(),
            supplied: Some(supplied.to_string()),
            applied: Some(id_of(resolution.value()).to_string()),
        });
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
