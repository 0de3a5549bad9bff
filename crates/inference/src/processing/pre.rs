use crate::config::DEFAULT_INPUT_SIZE;
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

/// Maps model-input coordinates back onto the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl TransformParams {
    /// Undo the letterbox for one coordinate pair, clamped to the original image.
    #[inline]
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let x = ((x - self.offset_x) / self.scale).clamp(0.0, self.orig_width as f32);
        let y = ((y - self.offset_y) / self.scale).clamp(0.0, self.orig_height as f32);
        (x, y)
    }
}

pub struct PreProcessor {
    pub input_size: (u32, u32),
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    /// Buffers are sized on first use, so an unusable `input_size` surfaces
    /// as an error from [`PreProcessor::preprocess`].
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            letterboxed_buffer: Vec::new(),
        }
    }

    /// Letterbox `image` into the model input and build an NCHW tensor scaled to `[0, 1]`.
    pub fn preprocess(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        let _s = span!("preprocess");

        let buffer_len = letterbox_len(self.input_size)?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess an empty {}x{} image", width, height);
        }

        tracing::trace!(width, height, "Preprocessing image");

        if self.letterboxed_buffer.len() != buffer_len {
            self.letterboxed_buffer = vec![LETTERBOX_COLOR; buffer_len];
        }

        let (scale, offset_x, offset_y) = self.resize_and_letterbox(image)?;

        let input = self.normalize()?;

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            scale,
            offset_x,
            offset_y,
        };

        Ok((input, transform))
    }

    fn resize_and_letterbox(&mut self, image: &RgbImage) -> anyhow::Result<(f32, f32, f32)> {
        let _s = span!("resize_and_letterbox");

        let (width, height) = image.dimensions();

        let (input_width, input_height) = self.input_size;
        let scale = (input_width as f32 / width as f32).min(input_height as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, input_width);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, input_height);

        let offset_x = (input_width - new_width) / 2;
        let offset_y = (input_height - new_height) / 2;

        let src = ImageRef::new(width, height, image.as_raw(), PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let row_len = new_width as usize * 3;
        let stride = input_width as usize * 3;

        for y in 0..new_height as usize {
            let src_row = y * row_len;
            let dst_row = (y + offset_y as usize) * stride + offset_x as usize * 3;

            self.letterboxed_buffer[dst_row..dst_row + row_len]
                .copy_from_slice(&resized_data[src_row..src_row + row_len]);
        }

        Ok((scale, offset_x as f32, offset_y as f32))
    }

    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output)?)
    }
}

/// Byte length of an RGB `input_size` raster, rejecting empty or overflowing sizes.
fn letterbox_len((width, height): (u32, u32)) -> anyhow::Result<usize> {
    if width == 0 || height == 0 {
        anyhow::bail!("Invalid model input size {}x{}", width, height);
    }

    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| anyhow::anyhow!("Model input size {}x{} is too large", width, height))
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}
