use palette::{FromColor, LinSrgba, Srgba};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorLinPremul {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Alias for the premultiplied linear color type, for a friendlier name in APIs.
pub type Color = ColorLinPremul;

// sRGB → Linear premultiplied conversions.
impl ColorLinPremul {
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    #[inline]
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_srgba_u8([r, g, b, a])
    }

    /// Create from a packed `0xRRGGBBAA` value, the format actors store their colour in.
    #[inline]
    pub fn from_rgba_u32(c: u32) -> Self {
        Self::from_srgba_u8(c.to_be_bytes())
    }

    /// Create from sRGB u8 RGBA array (premultiplied in linear space).
    #[inline]
    pub fn from_srgba_u8(c: [u8; 4]) -> Self {
        let s = Srgba::new(
            c[0] as f32 / 255.0,
            c[1] as f32 / 255.0,
            c[2] as f32 / 255.0,
            c[3] as f32 / 255.0,
        );
        let lin: LinSrgba = LinSrgba::from_color(s);
        Self {
            r: lin.red * lin.alpha,
            g: lin.green * lin.alpha,
            b: lin.blue * lin.alpha,
            a: lin.alpha,
        }
    }

    /// Convert back to sRGB u8 RGBA array (unpremultiplied).
    #[inline]
    pub fn to_srgba_u8(&self) -> [u8; 4] {
        let (r, g, b) = if self.a > 0.0001 {
            (self.r / self.a, self.g / self.a, self.b / self.a)
        } else {
            (0.0, 0.0, 0.0)
        };

        let lin = LinSrgba::new(r, g, b, self.a);
        let srgb: Srgba = Srgba::from_color(lin);

        [
            (srgb.red * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.green * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.blue * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        ]
    }

    /// Greyscale version at reduced opacity; used to render disabled subtrees.
    pub fn dimmed(&self) -> Self {
        // Rec. 709 luma on linear components; premultiplication is preserved.
        let luma = 0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b;
        Self { r: luma, g: luma, b: luma, a: self.a }.scale_alpha(DIM_OPACITY)
    }

    /// Multiply all premultiplied components by `k`.
    pub fn scale_alpha(&self, k: f32) -> Self {
        Self { r: self.r * k, g: self.g * k, b: self.b * k, a: self.a * k }
    }
}

/// Opacity applied to content painted inside a dimmed (disabled) subtree.
pub const DIM_OPACITY: f32 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_roundtrip() {
        let c = Color::from_rgba_u32(0x3366ccff);
        assert_eq!(c.to_srgba_u8(), [0x33, 0x66, 0xcc, 0xff]);
    }

    #[test]
    fn test_dimmed_is_grey_and_translucent() {
        let c = Color::from_rgba_u32(0xff0000ff).dimmed();
        assert!((c.r - c.g).abs() < 1e-6 && (c.g - c.b).abs() < 1e-6);
        assert!((c.a - DIM_OPACITY).abs() < 1e-6);
    }
}
