use asset::GlyphAtlas;
use engine::TextVertex;

/// Lay out `text` as two triangles per glyph, pen starting at (`x`, `y`)
/// with y growing downward. Glyph tops align with the top of `'H'`;
/// characters missing from the atlas are skipped without advancing.
pub fn layout_text(atlas: &GlyphAtlas, text: &str, scale: f32, x: f32, y: f32) -> Vec<TextVertex> {
    let cap_top = atlas.glyph('H').map_or(0, |h| h.bearing.y) as f32;
    let (atlas_w, atlas_h) = (atlas.width(), atlas.height());

    let mut pen_x = x;
    let mut vertices = Vec::with_capacity(text.len() * 6);
    for ch in text.chars() {
        let Some(glyph) = atlas.glyph(ch) else {
            continue;
        };

        let xpos = pen_x + glyph.bearing.x as f32 * scale;
        let ypos = y + (cap_top - glyph.bearing.y as f32) * scale;
        let w = glyph.size.x as f32 * scale;
        let h = glyph.size.y as f32 * scale;
        let [u0, v0, u1, v1] = glyph.region.uv_rect(atlas_w, atlas_h);

        // Whitespace has no bitmap; it only moves the pen.
        if w > 0.0 && h > 0.0 {
            vertices.extend_from_slice(&[
                TextVertex::new(xpos, ypos + h, u0, v1),
                TextVertex::new(xpos + w, ypos, u1, v0),
                TextVertex::new(xpos, ypos, u0, v0),
                TextVertex::new(xpos, ypos + h, u0, v1),
                TextVertex::new(xpos + w, ypos + h, u1, v1),
                TextVertex::new(xpos + w, ypos, u1, v0),
            ]);
        }
        pen_x += glyph.advance * scale;
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use asset::GlyphBitmap;
    use corelib::{IVec2, ivec2};

    fn bitmap(ch: char, size: IVec2, bearing: IVec2, advance: f32) -> GlyphBitmap {
        GlyphBitmap {
            ch,
            width: size.x as u32,
            height: size.y as u32,
            coverage: vec![200; (size.x * size.y) as usize],
            bearing,
            advance,
        }
    }

    fn atlas() -> GlyphAtlas {
        GlyphAtlas::pack(&[
            bitmap('H', ivec2(8, 10), ivec2(1, 10), 9.0),
            bitmap('a', ivec2(6, 7), ivec2(0, 7), 7.0),
            bitmap('g', ivec2(6, 9), ivec2(1, 6), 7.0),
            bitmap(' ', ivec2(0, 0), ivec2(0, 0), 4.0),
        ])
        .unwrap()
    }

    fn positions(v: &[TextVertex]) -> Vec<[f32; 2]> {
        v.iter().map(|v| [v.pos_uv[0], v.pos_uv[1]]).collect()
    }

    #[test]
    fn quad_follows_bearing_and_cap_height() {
        let atlas = atlas();
        let v = layout_text(&atlas, "Ha", 1.0, 100.0, 50.0);
        assert_eq!(v.len(), 12);

        // 'H': xpos = 100 + 1, ypos = 50 + (10 - 10)
        assert_eq!(
            positions(&v[..6]),
            vec![[101.0, 60.0], [109.0, 50.0], [101.0, 50.0], [101.0, 60.0], [109.0, 60.0], [109.0, 50.0]]
        );
        // 'a' after advance 9: xpos = 109, ypos = 50 + (10 - 7)
        assert_eq!(v[8].pos_uv[0], 109.0);
        assert_eq!(v[8].pos_uv[1], 53.0);
        assert_eq!(v[7].pos_uv[0], 115.0);
        assert_eq!(v[6].pos_uv[1], 60.0);
    }

    #[test]
    fn descender_hangs_below_baseline() {
        let atlas = atlas();
        let v = layout_text(&atlas, "g", 1.0, 0.0, 0.0);
        // top at cap_top - bearing.y = 4, bottom 9 px lower
        assert_eq!(v[2].pos_uv[1], 4.0);
        assert_eq!(v[0].pos_uv[1], 13.0);
    }

    #[test]
    fn scale_multiplies_offsets_and_advance() {
        let atlas = atlas();
        let v = layout_text(&atlas, "aa", 2.0, 0.0, 0.0);
        // second 'a' starts one scaled advance later
        assert_relative_eq!(v[8].pos_uv[0] - v[2].pos_uv[0], 14.0);
        // scaled height
        assert_relative_eq!(v[0].pos_uv[1] - v[2].pos_uv[1], 14.0);
    }

    #[test]
    fn space_advances_without_geometry_and_unknown_is_skipped() {
        let atlas = atlas();
        let v = layout_text(&atlas, "a a", 1.0, 0.0, 0.0);
        assert_eq!(v.len(), 12);
        assert_eq!(v[8].pos_uv[0], 11.0);

        let skipped = layout_text(&atlas, "a\u{e9}a", 1.0, 0.0, 0.0);
        assert_eq!(skipped.len(), 12);
        assert_eq!(skipped[8].pos_uv[0], 7.0);
    }

    #[test]
    fn texture_coordinates_cover_the_glyph_region() {
        let atlas = atlas();
        let v = layout_text(&atlas, "H", 1.0, 0.0, 0.0);
        let uv = atlas.glyph('H').unwrap().region.uv_rect(atlas.width(), atlas.height());
        // top-left vertex samples the region's top-left
        assert_eq!([v[2].pos_uv[2], v[2].pos_uv[3]], [uv[0], uv[1]]);
        // bottom-right vertex samples the region's bottom-right
        assert_eq!([v[4].pos_uv[2], v[4].pos_uv[3]], [uv[2], uv[3]]);
    }

    #[test]
    fn empty_atlas_lays_out_nothing() {
        let atlas = GlyphAtlas::pack(&[]).unwrap();
        assert!(layout_text(&atlas, "Hello", 1.0, 0.0, 0.0).is_empty());
    }
}
