/// ## RGBA colour, components nominally in `0..=1`

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Color {
        Color::rgb(1.0, 1.0, 1.0)
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    fn zip<F: Fn(f32, f32) -> f32>(self, other: Color, f: F) -> Color {
        Color {
            r: f(self.r, other.r),
            g: f(self.g, other.g),
            b: f(self.b, other.b),
            a: f(self.a, other.a),
        }
    }

    pub fn add(self, other: Color) -> Color {
        self.zip(other, |x, y| x + y)
    }

    pub fn sub(self, other: Color) -> Color {
        self.zip(other, |x, y| x - y)
    }

    /// Component-wise product, used for tinting.
    pub fn mul(self, other: Color) -> Color {
        self.zip(other, |x, y| x * y)
    }

    /// Scales the colour channels; alpha is kept.
    pub fn scale(self, s: f32) -> Color {
        Color {
            r: self.r * s,
            g: self.g * s,
            b: self.b * s,
            a: self.a,
        }
    }

    pub fn components(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let c: Vec<String> = self
            .components()
            .iter()
            .map(|v| super::fmt_scalar(f64::from(*v)))
            .collect();
        write!(f, "Color({})", c.join(", "))
    }
}
