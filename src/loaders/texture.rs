use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;
use std::borrow::Cow;
use std::path::Path;

use crate::scene::TextureData;

/// Loads an image file (backdrops) as RGBA8
pub fn load_image(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Failed to load image: {:?}", path))?
        .to_rgba8();

    log::info!("Loaded image {:?} ({}x{})", path, image.width(), image.height());

    Ok(TextureData {
        width: image.width(),
        height: image.height(),
        data: image.into_raw(),
    })
}

/// Converts a decoded glTF image to RGBA8
pub fn from_gltf_image(image: &gltf::image::Data) -> TextureData {
    let pixels = &image.pixels;

    let data = match image.format {
        gltf::image::Format::R8G8B8A8 => pixels.clone(),
        gltf::image::Format::R8G8B8 => expand_channels(pixels, 3, |px| [px[0], px[1], px[2], 255]),
        gltf::image::Format::R8G8 => expand_channels(pixels, 2, |px| [px[0], px[1], 0, 255]),
        gltf::image::Format::R8 => expand_channels(pixels, 1, |px| [px[0], px[0], px[0], 255]),
        other => {
            log::warn!("Unsupported texture format {:?}, using white", other);
            vec![255; (image.width * image.height * 4) as usize]
        }
    };

    TextureData {
        width: image.width,
        height: image.height,
        data,
    }
}

/// Shrinks a texture so neither side exceeds `max_dimension`, keeping its
/// aspect ratio. Textures that already fit are borrowed unchanged.
pub fn fit_to_limit(texture: &TextureData, max_dimension: u32) -> Result<Cow<'_, TextureData>> {
    let expected = texture.width as usize * texture.height as usize * 4;
    if texture.width == 0 || texture.height == 0 || texture.data.len() != expected {
        return Err(anyhow!(
            "Invalid texture: {}x{} with {} bytes",
            texture.width,
            texture.height,
            texture.data.len()
        ));
    }

    let longest = texture.width.max(texture.height);
    if longest <= max_dimension {
        return Ok(Cow::Borrowed(texture));
    }

    let scale = max_dimension as f64 / longest as f64;
    let width = ((texture.width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let height = ((texture.height as f64 * scale).round() as u32).clamp(1, max_dimension);

    let image = RgbaImage::from_raw(texture.width, texture.height, texture.data.clone())
        .ok_or_else(|| anyhow!("Texture data does not match its size"))?;
    let resized = image::imageops::resize(&image, width, height, FilterType::Triangle);

    Ok(Cow::Owned(TextureData {
        width,
        height,
        data: resized.into_raw(),
    }))
}

fn expand_channels(pixels: &[u8], channels: usize, to_rgba: impl Fn(&[u8]) -> [u8; 4]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixels.len() / channels * 4);
    for px in pixels.chunks_exact(channels) {
        rgba.extend_from_slice(&to_rgba(px));
    }
    rgba
}
