//! Grayscale training images and their 3x3 neighbourhood views.
//!
//! The evolution never touches pixels through `(x, y)` coordinates on the hot
//! path. Instead the noisy image is preprocessed once into two redundant
//! layouts:
//!
//! * a window array: one `[u8; 9]` neighbourhood per pixel, used by the
//!   scalar evaluation path,
//! * nine neighbour planes: `planes[w][i]` is the w-th neighbour of pixel
//!   `i`, zero-padded to a [`PLANE_ALIGNMENT`] multiple, used by the lane
//!   evaluation paths.
//!
//! Edge pixels sample their neighbourhood with clamped coordinates.

use std::fmt;
use std::path::Path;

use image::ImageReader;

/// Pixels in a 3x3 neighbourhood window.
pub const WINDOW_SIZE: usize = 9;

/// Index of the center pixel within a window.
pub const WINDOW_CENTER: usize = 4;

/// Neighbour planes are padded to a multiple of this many bytes so that the
/// widest lane kernel can always load a full block.
pub const PLANE_ALIGNMENT: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: String,
        source: image::ImageError,
    },
    #[error("failed to write image {path}: {source}")]
    Write {
        path: String,
        source: image::ImageError,
    },
    #[error("image dimensions differ: {0}x{1} vs {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
}

/// Single-channel 8-bit image.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decodes any supported file format to 8-bit luma.
    pub fn load(path: &Path) -> Result<Self, ImageError> {
        let read_err = |source| ImageError::Read {
            path: path.display().to_string(),
            source,
        };
        let decoded = ImageReader::open(path)
            .map_err(|e| read_err(image::ImageError::IoError(e)))?
            .decode()
            .map_err(read_err)?
            .into_luma8();
        Ok(Self {
            width: decoded.width() as usize,
            height: decoded.height() as usize,
            pixels: decoded.into_raw(),
        })
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width as u32,
            self.height as u32,
            image::ExtendedColorType::L8,
        )
        .map_err(|source| ImageError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        let index = self.index(x, y);
        self.pixels[index] = value;
    }

    /// Index of the neighbour at `(offset_x, offset_y)` relative to the given
    /// pixel, with coordinates clamped to the image borders.
    #[inline]
    fn neighbour_index(&self, x: usize, y: usize, offset_x: isize, offset_y: isize) -> usize {
        let nx = (x as isize + offset_x).clamp(0, self.width as isize - 1) as usize;
        let ny = (y as isize + offset_y).clamp(0, self.height as isize - 1) as usize;
        self.index(nx, ny)
    }

    /// The 3x3 neighbourhood of a pixel, row by row.
    pub fn window(&self, x: usize, y: usize) -> [u8; WINDOW_SIZE] {
        let mut window = [0; WINDOW_SIZE];
        for (w, (offset_x, offset_y)) in NEIGHBOUR_OFFSETS.iter().enumerate() {
            window[w] = self.pixels[self.neighbour_index(x, y, *offset_x, *offset_y)];
        }
        window
    }

    /// One window per pixel, in pixel-index order.
    pub fn split_windows(&self) -> Vec<[u8; WINDOW_SIZE]> {
        let mut windows = vec![[0; WINDOW_SIZE]; self.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                windows[self.index(x, y)] = self.window(x, y);
            }
        }
        windows
    }

    /// The window array transposed into nine per-neighbour planes, each
    /// zero-padded to a [`PLANE_ALIGNMENT`] multiple.
    pub fn split_planes(&self) -> [Vec<u8>; WINDOW_SIZE] {
        let padded = padded_len(self.len());
        let mut planes: [Vec<u8>; WINDOW_SIZE] = std::array::from_fn(|_| vec![0; padded]);
        for y in 0..self.height {
            for x in 0..self.width {
                let index = self.index(x, y);
                for (w, (offset_x, offset_y)) in NEIGHBOUR_OFFSETS.iter().enumerate() {
                    planes[w][index] = self.pixels[self.neighbour_index(x, y, *offset_x, *offset_y)];
                }
            }
        }
        planes
    }

    /// PSNR-style fitness of `filtered` against `self`: `255^2 * N / sum of
    /// squared differences`. Higher is better.
    pub fn psnr(&self, filtered: &Image) -> f64 {
        assert_eq!(self.width, filtered.width);
        assert_eq!(self.height, filtered.height);

        let coefficient = 255.0 * 255.0 * self.len() as f64;
        let sum: f64 = self
            .pixels
            .iter()
            .zip(filtered.pixels.iter())
            .map(|(&a, &b)| {
                let diff = a as f64 - b as f64;
                diff * diff
            })
            .sum();
        coefficient / sum
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({}x{})", self.width, self.height)
    }
}

/// Neighbour sampling order: row by row, top-left to bottom-right.
const NEIGHBOUR_OFFSETS: [(isize, isize); WINDOW_SIZE] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Rounds a sample count up to the next [`PLANE_ALIGNMENT`] boundary.
/// A full padding block is appended even on an exact multiple.
pub fn padded_len(len: usize) -> usize {
    len + (PLANE_ALIGNMENT - len % PLANE_ALIGNMENT)
}

/// The original/noisy image pair with the preprocessed neighbourhood views of
/// the noisy image. Built once at startup and shared read-only by all
/// evaluators.
#[derive(Debug)]
pub struct TrainingSet {
    pub original: Image,
    pub noisy: Image,
    pub windows: Vec<[u8; WINDOW_SIZE]>,
    pub planes: [Vec<u8>; WINDOW_SIZE],
}

impl TrainingSet {
    pub fn new(original: Image, noisy: Image) -> Result<Self, ImageError> {
        if original.width != noisy.width || original.height != noisy.height {
            return Err(ImageError::DimensionMismatch(
                original.width,
                original.height,
                noisy.width,
                noisy.height,
            ));
        }
        let windows = noisy.split_windows();
        let planes = noisy.split_planes();
        Ok(Self {
            original,
            noisy,
            windows,
            planes,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.original.len()
    }
}
