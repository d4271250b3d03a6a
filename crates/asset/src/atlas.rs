//! Glyph atlas: every rasterized glyph packed into one R8 texture.
//!
//! Packing is a plain shelf packer. Glyphs are sorted tallest first and laid
//! out left to right; a new shelf starts when the row is full. The width
//! starts at the power of two nearest a square for the glyph area and doubles
//! until the shelves fit; the height is rounded up to a power of two. Neither
//! side exceeds the requested maximum.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, bail};
use corelib::{IVec2, ivec2};

use crate::font::GlyphBitmap;
use crate::texture::TextureData;

/// Narrowest atlas the packer produces.
pub const MIN_ATLAS_SIZE: u32 = 256;
/// Default upper bound for either side; wgpu's default
/// `max_texture_dimension_2d`.
pub const MAX_ATLAS_SIZE: u32 = 8192;
const PADDING: u32 = 1;

/// Identity of an atlas for GPU-side caching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(pub u64);

impl AtlasId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pixel rectangle inside the atlas texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRegion {
    pub fn overlaps(&self, other: &AtlasRegion) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Normalized `[u0, v0, u1, v1]` for an atlas of the given size.
    pub fn uv_rect(&self, atlas_width: u32, atlas_height: u32) -> [f32; 4] {
        let w = atlas_width.max(1) as f32;
        let h = atlas_height.max(1) as f32;
        [
            self.x as f32 / w,
            self.y as f32 / h,
            (self.x + self.width) as f32 / w,
            (self.y + self.height) as f32 / h,
        ]
    }
}

/// Per-character placement and metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub region: AtlasRegion,
    /// Bitmap size in pixels.
    pub size: IVec2,
    /// Offset from the baseline to the bitmap's left/top.
    pub bearing: IVec2,
    pub advance: f32,
}

#[derive(Clone, Debug)]
pub struct GlyphAtlas {
    pub id: AtlasId,
    pub texture: TextureData,
    pub glyphs: BTreeMap<char, Glyph>,
}

type Placement<'a> = (&'a GlyphBitmap, AtlasRegion);

/// Shelf-pack `order` into rows `width` wide. Returns the placements and the
/// used height including the bottom padding.
fn shelf_pack<'a>(order: &[&'a GlyphBitmap], width: u32) -> (Vec<Placement<'a>>, u32) {
    let mut placements = Vec::with_capacity(order.len());
    let (mut cursor_x, mut cursor_y, mut shelf_height) = (PADDING, PADDING, 0u32);

    for &bitmap in order {
        if cursor_x + bitmap.width + PADDING > width {
            cursor_x = PADDING;
            cursor_y += shelf_height + PADDING;
            shelf_height = 0;
        }
        placements.push((
            bitmap,
            AtlasRegion {
                x: cursor_x,
                y: cursor_y,
                width: bitmap.width,
                height: bitmap.height,
            },
        ));
        cursor_x += bitmap.width + PADDING;
        shelf_height = shelf_height.max(bitmap.height);
    }

    (placements, cursor_y + shelf_height + PADDING)
}

impl GlyphAtlas {
    /// Pack glyph bitmaps into a fresh atlas no larger than
    /// [`MAX_ATLAS_SIZE`] on either side.
    pub fn pack(bitmaps: &[GlyphBitmap]) -> Result<Self> {
        Self::pack_within(bitmaps, MAX_ATLAS_SIZE)
    }

    /// Pack into an atlas whose sides stay within `max_size`. Single glyphs
    /// larger than that are dropped with a warning; an error is returned
    /// when the remaining glyphs still do not fit.
    pub fn pack_within(bitmaps: &[GlyphBitmap], max_size: u32) -> Result<Self> {
        let mut order: Vec<&GlyphBitmap> = bitmaps
            .iter()
            .filter(|b| {
                let fits = b.width + 2 * PADDING <= max_size && b.height + 2 * PADDING <= max_size;
                if !fits {
                    log::warn!(
                        "Glyph {:?} is {}x{}px and does not fit a {}px atlas",
                        b.ch,
                        b.width,
                        b.height,
                        max_size
                    );
                }
                fits
            })
            .collect();
        order.sort_by(|a, b| b.height.cmp(&a.height).then(a.ch.cmp(&b.ch)));

        let area: u64 = order
            .iter()
            .map(|b| u64::from(b.width + PADDING) * u64::from(b.height + PADDING))
            .sum();
        let widest = order.iter().map(|b| b.width + 2 * PADDING).max().unwrap_or(0);
        let square = (area as f64).sqrt().ceil() as u32;
        let mut width = square
            .max(widest)
            .max(MIN_ATLAS_SIZE)
            .next_power_of_two()
            .min(max_size);

        let (placements, height) = loop {
            let (placements, used_height) = shelf_pack(&order, width);
            if used_height <= max_size {
                break (placements, used_height.next_power_of_two().min(max_size));
            }
            if width >= max_size {
                bail!(
                    "{} glyphs do not fit a {}x{} atlas",
                    order.len(),
                    max_size,
                    max_size
                );
            }
            width = (width * 2).min(max_size);
        };

        let mut texture = TextureData::blank_r8(width, height);
        let mut glyphs = BTreeMap::new();

        for (bitmap, region) in placements {
            for row in 0..region.height {
                let src = (row * region.width) as usize;
                let dst = ((region.y + row) * width + region.x) as usize;
                let len = region.width as usize;
                texture.data[dst..dst + len].copy_from_slice(&bitmap.coverage[src..src + len]);
            }
            glyphs.insert(
                bitmap.ch,
                Glyph {
                    region,
                    size: ivec2(bitmap.width as i32, bitmap.height as i32),
                    bearing: bitmap.bearing,
                    advance: bitmap.advance,
                },
            );
        }

        log::debug!(
            "Packed {} glyphs into {}x{} atlas",
            glyphs.len(),
            width,
            height
        );

        Ok(Self {
            id: AtlasId::next(),
            texture,
            glyphs,
        })
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn width(&self) -> u32 {
        self.texture.width
    }

    pub fn height(&self) -> u32 {
        self.texture.height
    }
}
