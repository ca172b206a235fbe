use crate::pipeline::ColorMode;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

// ============================================================================
// LoadImage
// ============================================================================

/// Loads images from disk and converts them to the configured color mode.
///
/// Reads the whole file through a buffered reader, then lets the `image` crate
/// guess the format from the content (JPEG, PNG, BMP, GIF, TIFF, WebP, ...).
///
/// # Example
/// ```ignore
/// let loader = LoadImage::new(ColorMode::Grayscale);
/// let image = loader.load(Path::new("face.jpg"))?; // DynamicImage::ImageLuma8
/// ```
#[derive(Debug, Clone)]
pub struct LoadImage {
    buffer_size: usize,
    color_mode: ColorMode,
}

impl LoadImage {
    /// Creates a new image loader with an 8KB read buffer.
    pub fn new(color_mode: ColorMode) -> Self {
        Self {
            buffer_size: 8192,
            color_mode,
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Decodes `path` into an 8-bit image in this loader's color mode.
    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let file_size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;

        let image = ImageReader::new(Cursor::new(buffer))
            .with_guessed_format()
            .with_context(|| format!("Failed to detect image format: {}", path.display()))?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;

        Ok(self.color_mode.convert(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn create_test_image() -> Result<NamedTempFile> {
        // Create a test image (3x3 RGB)
        let mut test_img = RgbImage::new(3, 3);
        test_img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        test_img.put_pixel(1, 1, Rgb([0, 255, 0])); // Green
        test_img.put_pixel(2, 2, Rgb([0, 0, 255])); // Blue

        let temp_file = NamedTempFile::with_suffix(".png")?;
        test_img.save(temp_file.path())?;
        Ok(temp_file)
    }

    #[test]
    fn test_load_image() -> Result<()> {
        let temp_file = create_test_image()?;

        let loader = LoadImage::new(ColorMode::Color);
        let loaded_image = loader.load(temp_file.path())?;

        assert_eq!(loaded_image.dimensions(), (3, 3));
        let rgb = loaded_image.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([0, 255, 0]));
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_load_image_grayscale() -> Result<()> {
        let temp_file = create_test_image()?;

        let loaded = LoadImage::new(ColorMode::Grayscale).load(temp_file.path())?;
        assert!(matches!(loaded, DynamicImage::ImageLuma8(_)));
        assert_eq!(loaded.dimensions(), (3, 3));
        Ok(())
    }

    #[test]
    fn test_error_handling() -> Result<()> {
        let loader = LoadImage::new(ColorMode::Color);
        let result = loader.load(&PathBuf::from("nonexistent.jpg"));
        assert!(result.is_err(), "Should error for non-existent file");

        let garbage = NamedTempFile::with_suffix(".png")?;
        std::fs::write(garbage.path(), b"definitely not an image")?;
        assert!(loader.load(garbage.path()).is_err(), "Should error for corrupt file");
        Ok(())
    }
}
