//! Colours: arcade defaults, btop-style `theme[key]="value"` overrides, and palettes.

use crate::Palette;
use crate::game::{ShapeKind, Tag};
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Theme keys for the seven catalog shapes, in `ShapeKind::ALL` order.
const SHAPE_KEYS: [&str; 7] = [
    "shape_i", "shape_o", "shape_t", "shape_l", "shape_j", "shape_s", "shape_z",
];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Entity colours, indexed by `ShapeKind::index`.
    pub shapes: [Color; 7],
    pub cluster: Color,
    /// Arena background.
    pub bg: Color,
    /// Grid dots and borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Empty part of the stamina meters.
    pub inactive_fg: Color,
    pub meter_held: Color,
    pub meter_cooldown: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::arcade()
    }
}

impl Theme {
    /// Classic tetromino colours on a near-black arena.
    pub fn arcade() -> Self {
        Self {
            shapes: [
                Color::Rgb(0, 255, 255),   // I cyan
                Color::Rgb(255, 255, 0),   // O yellow
                Color::Rgb(128, 0, 128),   // T purple
                Color::Rgb(255, 165, 0),   // L orange
                Color::Rgb(0, 0, 255),     // J blue
                Color::Rgb(0, 255, 0),     // S green
                Color::Rgb(255, 0, 0),     // Z red
            ],
            cluster: Color::Rgb(255, 255, 255),
            bg: Color::Rgb(10, 10, 10),
            div_line: Color::Rgb(30, 30, 30),
            main_fg: Color::Rgb(220, 220, 220),
            title: Color::Rgb(255, 255, 0),
            inactive_fg: Color::Rgb(100, 100, 100),
            meter_held: Color::Rgb(0, 255, 0),
            meter_cooldown: Color::Rgb(255, 0, 0),
        }
    }

    /// Load overrides from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// No path gives the defaults; unknown keys and bad values keep the default for that key.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            None => Self::arcade(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Swap entity colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.shapes = [
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x88, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                ];
                self.bg = Color::Rgb(0, 0, 0);
                self.div_line = Color::Rgb(60, 60, 60);
            }
            Palette::Colorblind => {
                // Tol bright/vibrant; J and Z differ from their neighbours in lightness too.
                self.shapes = [
                    Color::Rgb(0x33, 0xBB, 0xEE),
                    Color::Rgb(0xCC, 0xBB, 0x44),
                    Color::Rgb(0xAA, 0x33, 0x77),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xCC, 0x33, 0x11),
                ];
                self.meter_held = Color::Rgb(0x33, 0xBB, 0xEE);
                self.meter_cooldown = Color::Rgb(0xEE, 0x77, 0x33);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let mut theme = Self::arcade();
        for (slot, key) in theme.shapes.iter_mut().zip(SHAPE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        let singles: [(&str, &mut Color); 8] = [
            ("cluster", &mut theme.cluster),
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
            ("inactive_fg", &mut theme.inactive_fg),
            ("meter_held", &mut theme.meter_held),
            ("meter_cooldown", &mut theme.meter_cooldown),
        ];
        for (key, slot) in singles {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        theme
    }

    #[inline]
    pub fn shape_color(&self, kind: ShapeKind) -> Color {
        self.shapes[kind.index()]
    }

    pub fn tag_color(&self, tag: Tag) -> Color {
        match tag {
            Tag::Shape(kind) => self.shape_color(kind),
            Tag::Cluster => self.cluster,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        let Some(value) = rest.strip_prefix('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#FFA500").unwrap();
        assert!(matches!(c, Color::Rgb(0xFF, 0xA5, 0x00)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(
            r##"
# comment
theme[shape_t]="#AA00AA"
theme[cluster]='#EEEEEE'
theme[broken]
"##,
        );
        assert_eq!(map.get("shape_t"), Some(&"#AA00AA".to_string()));
        assert_eq!(map.get("cluster"), Some(&"#EEEEEE".to_string()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_overrides_keep_other_defaults() {
        let map = parse_theme_file(r##"theme[shape_z]="#010203""##);
        let theme = Theme::from_map(&map);
        assert_eq!(theme.shape_color(ShapeKind::Z), Color::Rgb(1, 2, 3));
        assert_eq!(theme.shape_color(ShapeKind::I), Color::Rgb(0, 255, 255));
        assert_eq!(theme.tag_color(Tag::Cluster), Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_palettes_change_shapes_only_when_asked() {
        let mut theme = Theme::arcade();
        theme.apply_palette(Palette::Normal);
        assert_eq!(theme.shape_color(ShapeKind::L), Color::Rgb(255, 165, 0));
        theme.apply_palette(Palette::Colorblind);
        assert_ne!(theme.shape_color(ShapeKind::L), Color::Rgb(255, 165, 0));
    }
}
