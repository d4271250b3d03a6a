//! Font loading and glyph rasterization (fontdue).

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use corelib::{IVec2, ivec2};

/// Rasterized glyph: 8-bit coverage plus metrics in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphBitmap {
    pub ch: char,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
    /// Offset from the pen position on the baseline to the bitmap's left/top edge.
    pub bearing: IVec2,
    /// Horizontal pen advance.
    pub advance: f32,
}

pub struct FontFace {
    font: fontdue::Font,
    pixel_size: f32,
}

impl FontFace {
    pub fn load(path: impl AsRef<Path>, pixel_size: u32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        Self::from_bytes(&bytes, pixel_size)
            .with_context(|| format!("Failed to load font face from {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8], pixel_size: u32) -> Result<Self> {
        if pixel_size == 0 {
            anyhow::bail!("Font pixel size must be positive");
        }
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| anyhow!("Font parse error: {e}"))?;
        Ok(Self {
            font,
            pixel_size: pixel_size as f32,
        })
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }

    /// Rasterize one character; `None` when the face has no glyph for it.
    pub fn rasterize(&self, ch: char) -> Option<GlyphBitmap> {
        if !self.has_glyph(ch) {
            return None;
        }
        let (metrics, coverage) = self.font.rasterize(ch, self.pixel_size);
        Some(GlyphBitmap {
            ch,
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage,
            // fontdue's ymin is the bottom edge relative to the baseline, y up
            bearing: ivec2(metrics.xmin, metrics.ymin + metrics.height as i32),
            advance: metrics.advance_width,
        })
    }

    /// Rasterize the printable 7-bit ASCII range. Control characters are
    /// never drawn and are left out; characters the face lacks are skipped.
    pub fn rasterize_ascii(&self) -> Vec<GlyphBitmap> {
        let mut glyphs = Vec::with_capacity(128);
        for code in 0u8..128 {
            let ch = char::from(code);
            if ch.is_ascii_control() {
                continue;
            }
            match self.rasterize(ch) {
                Some(glyph) => glyphs.push(glyph),
                None => log::warn!("Failed to load glyph for {:?}", ch),
            }
        }
        log::info!(
            "Rasterized {} ASCII glyphs at {}px",
            glyphs.len(),
            self.pixel_size
        );
        glyphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_is_an_error() {
        let err = FontFace::load("fonts/definitely-missing.ttf", 12).err().unwrap();
        assert!(format!("{err:#}").contains("definitely-missing"));
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        assert!(FontFace::from_bytes(b"not a font at all", 12).is_err());
    }

    #[test]
    fn zero_pixel_size_is_rejected() {
        assert!(FontFace::from_bytes(&[], 0).is_err());
    }

    const DEJAVU_SANS: &[u8] = include_bytes!("../testdata/DejaVuSans.ttf");

    fn dejavu(px: u32) -> FontFace {
        FontFace::from_bytes(DEJAVU_SANS, px).unwrap()
    }

    #[test]
    fn capital_sits_on_the_baseline() {
        let h = dejavu(12).rasterize('H').unwrap();
        assert!(h.width > 0 && h.height > 0);
        assert_eq!(h.bearing.y, h.height as i32);
        assert!(h.bearing.x >= 0);
        assert_eq!(h.coverage.len(), (h.width * h.height) as usize);
        assert!(h.coverage.iter().any(|&c| c > 0));
    }

    #[test]
    fn descender_reaches_below_the_baseline() {
        let g = dejavu(12).rasterize('g').unwrap();
        assert!(g.bearing.y > 0);
        assert!(g.bearing.y < g.height as i32);
    }

    #[test]
    fn space_has_advance_but_no_bitmap() {
        let space = dejavu(12).rasterize(' ').unwrap();
        assert_eq!((space.width, space.height), (0, 0));
        assert!(space.coverage.is_empty());
        assert!(space.advance > 0.0);
    }

    #[test]
    fn ascii_set_skips_control_characters() {
        let glyphs = dejavu(12).rasterize_ascii();
        assert!(glyphs.iter().all(|g| !g.ch.is_ascii_control()));
        assert_eq!(glyphs.len(), 95);
        assert_eq!(glyphs.first().map(|g| g.ch), Some(' '));
        assert_eq!(glyphs.last().map(|g| g.ch), Some('~'));
    }

    #[test]
    fn glyphs_scale_with_pixel_size() {
        let small = dejavu(12).rasterize('H').unwrap();
        let large = dejavu(48).rasterize('H').unwrap();
        assert!(large.height > 3 * small.height);
        assert!(large.advance > 3.0 * small.advance);
    }

    #[test]
    fn loading_from_a_path_matches_the_bytes() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/DejaVuSans.ttf");
        let face = FontFace::load(path, 12).unwrap();
        assert_eq!(face.pixel_size(), 12.0);
        assert!(face.has_glyph('A'));
        assert!(!face.has_glyph('\u{10FFFF}'));
        assert_eq!(face.rasterize('H'), dejavu(12).rasterize('H'));
    }
}
