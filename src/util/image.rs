use crate::util::colouring::Colour;

use parking_lot::Mutex;
use std::path::Path;

/// Where the renderer delivers pixel colours. Called concurrently from the workers.
pub trait DrawSurface: Send + Sync {
    fn draw(&self, x: usize, y: usize, colour: Colour);

    /// Fills a block with its top left corner at (x, y).
    fn draw_block(&self, x: usize, y: usize, width: usize, height: usize, colour: Colour) {
        for j in y..(y + height) {
            for i in x..(x + width) {
                self.draw(i, j, colour);
            }
        }
    }
}

/// An RGB8 frame buffer.
pub struct Image {
    width: usize,
    height: usize,
    rgb: Mutex<Vec<u8>>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            width,
            height,
            rgb: Mutex::new(vec![0u8; width * height * 3])
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Colour {
        let rgb = self.rgb.lock();
        let k = (y * self.width + x) * 3;
        Colour::new(rgb[k], rgb[k + 1], rgb[k + 2])
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        let rgb = self.rgb.lock();
        image::save_buffer(path, &rgb, self.width as u32, self.height as u32, image::ColorType::Rgb8)
    }

    #[inline]
    fn plot(rgb: &mut [u8], index: usize, colour: Colour) {
        rgb[index] = colour.r;
        rgb[index + 1] = colour.g;
        rgb[index + 2] = colour.b;
    }
}

impl DrawSurface for Image {
    fn draw(&self, x: usize, y: usize, colour: Colour) {
        if x >= self.width || y >= self.height {
            return;
        }

        let mut rgb = self.rgb.lock();
        Image::plot(&mut rgb, (y * self.width + x) * 3, colour);
    }

    // clipped at the image edge and written under a single lock
    fn draw_block(&self, x: usize, y: usize, width: usize, height: usize, colour: Colour) {
        let horizontal = self.width.saturating_sub(x).min(width);
        let vertical = self.height.saturating_sub(y).min(height);

        let mut rgb = self.rgb.lock();

        for j in y..(y + vertical) {
            for i in x..(x + horizontal) {
                Image::plot(&mut rgb, (j * self.width + i) * 3, colour);
            }
        }
    }
}
