use colorgrad::{BlendMode, Color, CustomGradient, CustomGradientError, Interpolation};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// Colour of points that never escaped.
    pub const BLACK: Colour = Colour { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Colour {
            r,
            g,
            b
        }
    }
}

/// Maps an escape iteration to a colour.
///
/// Only called for escaped points, the renderer handles bounded ones.
pub trait Palette: Send + Sync {
    fn colour(&self, iteration: usize) -> Colour;
}

impl<F> Palette for F where F: Fn(usize) -> Colour + Send + Sync {
    fn colour(&self, iteration: usize) -> Colour {
        self(iteration)
    }
}

/// Colour for a grid value, with bounded points forced to black.
#[inline]
pub fn colour_for(palette: &dyn Palette, iteration: usize, maximum_iteration: usize) -> Colour {
    if iteration >= maximum_iteration {
        Colour::BLACK
    } else {
        palette.colour(iteration)
    }
}

/// A smooth cyclic palette sampled from a colorgrad gradient.
pub struct GradientPalette {
    palette_buffer: Vec<Color>,
    pub iteration_division: f32,
    pub palette_offset: f32,
}

impl GradientPalette {
    pub fn new(colours: &[(u8, u8, u8)], iteration_division: f32, palette_offset: f32) -> Result<Self, CustomGradientError> {
        let colours = colours.iter()
            .map(|value| Color::from_rgb_u8(value.0, value.1, value.2))
            .collect::<Vec<Color>>();

        let palette_generator = CustomGradient::new()
            .colors(&colours)
            .interpolation(Interpolation::CatmullRom)
            .mode(BlendMode::Oklab)
            .build()?;

        Ok(GradientPalette {
            palette_buffer: palette_generator.colors(colours.len() * 64),
            iteration_division,
            palette_offset
        })
    }

    pub fn default_palette() -> Result<Self, CustomGradientError> {
        GradientPalette::new(
            &[(0, 7, 100), (32, 107, 203), (237, 255, 255), (255, 170, 0), (0, 2, 0)],
            16.0,
            0.0
        )
    }
}

impl Palette for GradientPalette {
    fn colour(&self, iteration: usize) -> Colour {
        let temp = self.palette_buffer.len() as f32 * (iteration as f32 / self.iteration_division + self.palette_offset).fract();

        let pos1 = (temp.floor() as usize).min(self.palette_buffer.len() - 1);
        let pos2 = if pos1 >= (self.palette_buffer.len() - 1) {
            0
        } else {
            pos1 + 1
        };

        let frac = temp.fract() as f64;

        let (r, g, b, _) = self.palette_buffer[pos1].interpolate_rgb(&self.palette_buffer[pos2], frac).rgba_u8();
        Colour::new(r, g, b)
    }
}
