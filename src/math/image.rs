use super::Color;

/// ## Bitmap of colours, row-major from the top left

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Image {
    pub fn new(width: usize, height: usize, fill: Color) -> Option<Image> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Image {
            width,
            height,
            pixels: vec![fill; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// One-based pixel access.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x == 0 || y == 0 || x > self.width || y > self.height {
            return None;
        }
        Some(self.pixels[(y - 1) * self.width + (x - 1)])
    }

    pub fn map<F: Fn(Color) -> Color>(&self, f: F) -> Image {
        Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|c| f(*c)).collect(),
        }
    }

    pub fn zip<F: Fn(Color, Color) -> Color>(&self, other: &Image, f: F) -> Option<Image> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        Some(Image {
            width: self.width,
            height: self.height,
            pixels: self
                .pixels
                .iter()
                .zip(other.pixels.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }
}

impl std::fmt::Display for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Image({}x{})", self.width, self.height)
    }
}
