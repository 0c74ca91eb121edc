use image::RgbaImage;

pub const SPRITE_SIZE: u32 = 32;
pub const SPRITE_DATA_SIZE: usize = (SPRITE_SIZE * SPRITE_SIZE * 4) as usize;

/// Row-major RGBA pixel grid, 4 bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Bitmap {
            width,
            height,
            pixels: vec![0u8; (width * height * 4) as usize],
        }
    }

    /// A blank canvas sized for one sprite cell
    pub fn sprite() -> Self {
        Self::new(SPRITE_SIZE, SPRITE_SIZE)
    }

    /// Every byte set to `value`, handy for spotting unwritten pixels
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Bitmap {
            width,
            height,
            pixels: vec![value; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Out-of-range coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }
}
