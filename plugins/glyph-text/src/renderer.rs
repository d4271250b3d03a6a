use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::{FontFace, GlyphAtlas};
use corelib::{Mat4, Vec3};
use engine::shader::BASIC_TEXT_SHADER;
use engine::{DrawCommand, DrawList, TextRenderer, TextUniforms};

use crate::layout::layout_text;

/// Text provider backed by a prebuilt ASCII glyph atlas.
pub struct GlyphTextRenderer {
    atlas: Arc<GlyphAtlas>,
    color: Vec3,
}

impl GlyphTextRenderer {
    pub fn load(font: impl AsRef<Path>, pixel_size: u32) -> Result<Self> {
        let face = FontFace::load(font.as_ref(), pixel_size)?;
        let atlas = GlyphAtlas::pack(&face.rasterize_ascii())
            .with_context(|| format!("glyph atlas for {pixel_size}px text"))?;
        log::info!(
            "Glyph atlas for {} at {}px: {} glyphs, {}x{}",
            font.as_ref().display(),
            pixel_size,
            atlas.glyphs.len(),
            atlas.width(),
            atlas.height()
        );
        Ok(Self::from_atlas(atlas))
    }

    pub fn from_atlas(atlas: GlyphAtlas) -> Self {
        Self {
            atlas: Arc::new(atlas),
            color: Vec3::ONE,
        }
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }
}

impl TextRenderer for GlyphTextRenderer {
    fn name(&self) -> &str {
        "glyph-text"
    }

    fn render_text(
        &self,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        list: &mut DrawList,
    ) {
        let vertices = layout_text(&self.atlas, text, scale, x, y);
        if vertices.is_empty() {
            return;
        }
        // y grows downward: origin at the top-left of the viewport.
        let projection = Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0);
        list.push(DrawCommand::Text {
            shader: BASIC_TEXT_SHADER.to_owned(),
            atlas: self.atlas.clone(),
            uniforms: TextUniforms::new(projection, self.color),
            vertices,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::GlyphBitmap;
    use corelib::{ivec2, vec4};

    fn renderer() -> GlyphTextRenderer {
        let bitmaps = ['H', 'i']
            .map(|ch| GlyphBitmap {
                ch,
                width: 4,
                height: 6,
                coverage: vec![255; 24],
                bearing: ivec2(0, 6),
                advance: 5.0,
            })
            .to_vec();
        GlyphTextRenderer::from_atlas(GlyphAtlas::pack(&bitmaps).unwrap())
    }

    #[test]
    fn one_batched_command_per_call() {
        let r = renderer();
        let mut list = DrawList::new();
        r.render_text("Hi", 1.0, 10.0, 10.0, 800.0, 600.0, &mut list);
        assert_eq!(list.len(), 1);
        let DrawCommand::Text { vertices, shader, uniforms, .. } = &list.commands()[0] else {
            panic!("expected text command");
        };
        assert_eq!(shader, BASIC_TEXT_SHADER);
        assert_eq!(vertices.len(), 12);
        assert_eq!(uniforms.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn projection_maps_top_left_to_ndc_corner() {
        let r = renderer();
        let mut list = DrawList::new();
        r.render_text("H", 1.0, 0.0, 0.0, 800.0, 600.0, &mut list);
        let DrawCommand::Text { uniforms, .. } = &list.commands()[0] else {
            panic!("expected text command");
        };
        let proj = Mat4::from_cols_array_2d(&uniforms.projection);
        let corner = proj * vec4(0.0, 0.0, 0.0, 1.0);
        assert!((corner.x + 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
        let far = proj * vec4(800.0, 600.0, 0.0, 1.0);
        assert!((far.x - 1.0).abs() < 1e-6);
        assert!((far.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_text_records_nothing() {
        let r = renderer();
        let mut list = DrawList::new();
        r.render_text("???", 1.0, 0.0, 0.0, 100.0, 100.0, &mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn real_font_renders_end_to_end() {
        let font = concat!(env!("CARGO_MANIFEST_DIR"), "/../../crates/asset/testdata/DejaVuSans.ttf");
        let r = GlyphTextRenderer::load(font, 12).unwrap();
        let atlas = r.atlas();
        assert!(atlas.glyph('\n').is_none());
        let (h, g) = (atlas.glyph('H').unwrap(), atlas.glyph('g').unwrap());

        let mut list = DrawList::new();
        r.render_text("Hg", 1.0, 10.0, 20.0, 800.0, 600.0, &mut list);
        assert_eq!(list.len(), 1);
        let DrawCommand::Text { vertices, .. } = &list.commands()[0] else {
            panic!("expected text command");
        };
        assert_eq!(vertices.len(), 12);

        // vertex 2 of each quad is its top-left corner
        let h_top_left = &vertices[2].pos_uv;
        assert_eq!(h_top_left[0], 10.0 + h.bearing.x as f32);
        assert_eq!(h_top_left[1], 20.0);
        let g_top_left = &vertices[8].pos_uv;
        assert_eq!(g_top_left[0], 10.0 + h.advance + g.bearing.x as f32);
        assert_eq!(g_top_left[1], 20.0 + (h.bearing.y - g.bearing.y) as f32);
        // the descender reaches below the cap-height box
        assert!(g_top_left[1] + g.size.y as f32 > 20.0 + h.size.y as f32);
    }
}
