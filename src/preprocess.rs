use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),
    #[error("empty image payload")]
    Empty,
}

/// Axis order of the tensor handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, the layout Keras exports keep.
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Resize straight to the target square, ignoring aspect ratio.
    Stretch,
    /// Keep aspect ratio and pad the short side with black.
    Letterbox,
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(format!("unknown tensor layout '{}', expected nhwc or nchw", other)),
        }
    }
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stretch" => Ok(ResizeMode::Stretch),
            "letterbox" => Ok(ResizeMode::Letterbox),
            other => Err(format!("unknown resize mode '{}', expected stretch or letterbox", other)),
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorLayout::Nhwc => write!(f, "nhwc"),
            TensorLayout::Nchw => write!(f, "nchw"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    pub size: u32,
    pub layout: TensorLayout,
    pub resize: ResizeMode,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            size: 224,
            layout: TensorLayout::Nhwc,
            resize: ResizeMode::Stretch,
        }
    }
}

impl PreprocessOptions {
    /// Shape of the batch-of-one tensor `preprocess` produces.
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, side, side, 3],
            TensorLayout::Nchw => [1, 3, side, side],
        }
    }
}

/// Decodes `bytes` and turns them into a model input scaled to `[0, 1]`.
pub fn preprocess(bytes: &[u8], opts: &PreprocessOptions) -> Result<Array4<f32>, PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::Empty);
    }

    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let resized = match opts.resize {
        ResizeMode::Stretch => imageops::resize(&rgb, opts.size, opts.size, FilterType::CatmullRom),
        ResizeMode::Letterbox => letterbox(&rgb, opts.size),
    };

    Ok(to_tensor(&resized, opts.layout))
}

fn letterbox(img: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = img.dimensions();

    let (new_width, new_height) = if width > height {
        (size, ((size as u64 * height as u64) / width as u64).max(1) as u32)
    } else {
        (((size as u64 * width as u64) / height as u64).max(1) as u32, size)
    };

    let resized = imageops::resize(img, new_width, new_height, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;
    imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);
    canvas
}

fn to_tensor(img: &RgbImage, layout: TensorLayout) -> Array4<f32> {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::zeros((1, h, w, 3)),
        TensorLayout::Nchw => Array4::zeros((1, 3, h, w)),
    };

    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            match layout {
                TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
            }
        }
    }

    tensor
}
