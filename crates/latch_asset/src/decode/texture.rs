use super::{DecodeInput, Decoder};
use crate::{AssetError, AssetPayload, Texture2D};

/// Decodes any image format the `image` crate understands into RGBA8.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureDecoder;

impl Decoder for TextureDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        let bytes = input.require_bytes()?;
        let image = image::load_from_memory(bytes)
            .map_err(|err| input.error(format!("unreadable image: {err}")))?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(AssetPayload::Texture(Texture2D {
            width,
            height,
            pixels: rgba.into_raw(),
            gpu: None,
        }))
    }
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    let buffer = ImageBuffer::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    buffer
        .write_to(&mut out, ImageFormat::Png)
        .expect("png encoding into memory cannot fail");
    out.into_inner()
}
