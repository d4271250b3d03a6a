//! Texture data in CPU-friendly layout before GPU upload.

use std::path::Path;

use anyhow::{Context, Result, bail};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Single 8-bit channel; glyph coverage.
    R8,
    Rgba8,
}

impl TextureFormat {
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rgba8 => 4,
        }
    }
}

impl TextureData {
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        if data.len() != expected {
            bail!(
                "{:?} texture {}x{} needs {} bytes, got {}",
                format,
                width,
                height,
                expected,
                data.len()
            );
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, TextureFormat::Rgba8, data)
    }

    /// Decode an image file into RGBA8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("Failed to decode image {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Self::new_rgba8(width, height, image.into_raw())
    }

    /// Zero-filled single-channel texture.
    pub fn blank_r8(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
            format: TextureFormat::R8,
        }
    }

    /// 1x1 opaque white, bound when a mesh has no texture of its own.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Bytes per row of pixels.
    pub fn stride(&self) -> u32 {
        self.width * self.bytes_per_pixel()
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    /// Write the texture as PNG (grayscale for R8, RGBA otherwise).
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let color = match self.format {
            TextureFormat::R8 => image::ExtendedColorType::L8,
            TextureFormat::Rgba8 => image::ExtendedColorType::Rgba8,
        };
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            color,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("Failed to write texture to {}", path.display()))?;
        log::info!("Wrote {}x{} texture to {}", self.width, self.height, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_is_rejected() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new(2, 2, TextureFormat::R8, vec![0; 4]).is_ok());
    }

    #[test]
    fn white_texture_is_valid() {
        let t = TextureData::white();
        assert!(t.is_valid());
        assert_eq!(t.stride(), 4);
    }

    #[test]
    fn r8_png_round_trip_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.png");
        let mut tex = TextureData::blank_r8(8, 4);
        tex.data[3] = 200;
        tex.save_png(&path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(3, 0).0, [200]);
    }

    #[test]
    fn loading_expands_grayscale_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let mut tex = TextureData::blank_r8(2, 1);
        tex.data[1] = 200;
        tex.save_png(&path).unwrap();

        let loaded = TextureData::load(&path).unwrap();
        assert_eq!(loaded.format, TextureFormat::Rgba8);
        assert_eq!((loaded.width, loaded.height), (2, 1));
        assert_eq!(loaded.data, vec![0, 0, 0, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn loading_a_missing_image_names_the_file() {
        let err = TextureData::load("textures/nowhere.png").unwrap_err();
        assert!(format!("{err:#}").contains("nowhere.png"));
    }
}
