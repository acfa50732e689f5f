use image::{GrayImage, Luma};

/// Boolean per-pixel membership grid for one candidate object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Mask {
    /// Create an empty (all background) mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    /// Nonzero pixels are foreground
    pub fn from_luma(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.pixels().map(|p| p[0] != 0).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[self.offset(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let offset = self.offset(x, y);
            self.pixels[offset] = value;
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Number of foreground pixels
    pub fn area(&self) -> u64 {
        self.pixels.iter().filter(|&&p| p).count() as u64
    }

    /// Iterate foreground pixel coordinates in row-major order
    pub fn foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// Zeroth and first order raw image moments
    pub fn moments(&self) -> Moments {
        let mut moments = Moments::default();
        for (x, y) in self.foreground() {
            moments.m00 += 1;
            moments.m10 += x as u64;
            moments.m01 += y as u64;
        }
        moments
    }

    /// Area-weighted center, truncated to whole pixels. None for an empty mask.
    pub fn centroid(&self) -> Option<Centroid> {
        self.moments().centroid()
    }

    /// Render as a black/white image (foreground = 255)
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255u8]) } else { Luma([0u8]) }
        })
    }
}

/// Raw moments of a binary mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Moments {
    pub m00: u64,
    pub m10: u64,
    pub m01: u64,
}

impl Moments {
    pub fn centroid(&self) -> Option<Centroid> {
        if self.m00 == 0 {
            return None;
        }
        Some(Centroid {
            x: (self.m10 as f64 / self.m00 as f64) as u32,
            y: (self.m01 as f64 / self.m00 as f64) as u32,
        })
    }
}

/// Integer pixel coordinates of a mask center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Centroid {
    pub x: u32,
    pub y: u32,
}

impl Centroid {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, x: u32, y: u32) -> f64 {
        let dx = x as f64 - self.x as f64;
        let dy = y as f64 - self.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An accepted round object: center plus circumscribing radius (pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundObject {
    pub center: Centroid,
    pub radius: f64,
}

impl RoundObject {
    pub fn new(center: Centroid, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Fixed accessor over whatever a segmentation collaborator returns per object.
/// Only the boolean segmentation field is ever consumed.
pub trait SegmentationMask {
    fn segmentation(&self) -> &Mask;
}

impl SegmentationMask for Mask {
    fn segmentation(&self) -> &Mask {
        self
    }
}

impl<T: SegmentationMask + ?Sized> SegmentationMask for Box<T> {
    fn segmentation(&self) -> &Mask {
        (**self).segmentation()
    }
}
