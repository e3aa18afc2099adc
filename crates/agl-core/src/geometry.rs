#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    // Affine 2D: [a, b, c, d, e, f] for matrix [[a c e],[b d f],[0 0 1]]
    pub m: [f32; 6],
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }

    /// Compose two transforms: self ∘ other (apply `other`, then `self`).
    pub fn concat(self, other: Self) -> Self {
        let [a1, b1, c1, d1, e1, f1] = self.m;
        let [a2, b2, c2, d2, e2, f2] = other.m;
        let a = a1 * a2 + c1 * b2;
        let b = b1 * a2 + d1 * b2;
        let c = a1 * c2 + c1 * d2;
        let d = b1 * c2 + d1 * d2;
        let e = a1 * e2 + c1 * f2 + e1;
        let f = b1 * e2 + d1 * f2 + f1;
        Self {
            m: [a, b, c, d, e, f],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 1.0, tx, ty],
        }
    }

    /// True when the transform only translates (no scale, rotation or skew).
    pub fn is_translation(&self) -> bool {
        let [a, b, c, d, _, _] = self.m;
        a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0
    }

    /// Apply the transform to a point (x, y).
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        let [a, b, c, d, e, f] = self.m;
        [a * p[0] + c * p[1] + e, b * p[0] + d * p[1] + f]
    }

    /// Apply the inverse transform to a world-space point. Returns None if non-invertible.
    pub fn inverse_apply(&self, p: [f32; 2]) -> Option<[f32; 2]> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let ia = d * inv_det;
        let ib = -b * inv_det;
        let ic = -c * inv_det;
        let id = a * inv_det;
        // Inverse translation = -inv_linear * [e, f]
        let ie = -(ia * e + ic * f);
        let iff = -(ib * e + id * f);
        Some([ia * p[0] + ic * p[1] + ie, ib * p[0] + id * p[1] + iff])
    }

    /// Axis-aligned bounding box of `rect` after applying the transform.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let corners = [
            self.apply([rect.x, rect.y]),
            self.apply([rect.x + rect.w, rect.y]),
            self.apply([rect.x, rect.y + rect.h]),
            self.apply([rect.x + rect.w, rect.y + rect.h]),
        ];
        let mut minx = f32::INFINITY;
        let mut miny = f32::INFINITY;
        let mut maxx = f32::NEG_INFINITY;
        let mut maxy = f32::NEG_INFINITY;
        for [x, y] in corners {
            minx = minx.min(x);
            miny = miny.min(y);
            maxx = maxx.max(x);
            maxy = maxy.max(y);
        }
        Rect { x: minx, y: miny, w: maxx - minx, h: maxy - miny }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        if x2 > x1 && y2 > y1 {
            Some(Rect { x: x1, y: y1, w: x2 - x1, h: y2 - y1 })
        } else {
            None
        }
    }
}

impl From<Region> for Rect {
    fn from(r: Region) -> Self {
        Rect { x: r.x1, y: r.y1, w: r.width(), h: r.height() }
    }
}

/// Float rectangle stored as corners, in the parent's coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Region {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Region {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Region at the origin with the given size.
    pub const fn sized(width: f32, height: f32) -> Self {
        Self { x1: 0.0, y1: 0.0, x2: width, y2: height }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn origin(&self) -> [f32; 2] {
        [self.x1, self.y1]
    }

    /// Only regions with positive area are rendered.
    pub fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Half-open containment: the start edges are inside, the end edges are not.
    pub fn contains(&self, p: [f32; 2]) -> bool {
        p[0] >= self.x1 && p[0] < self.x2 && p[1] >= self.y1 && p[1] < self.y2
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self { x1: self.x1 + dx, y1: self.y1 + dy, x2: self.x2 + dx, y2: self.y2 + dy }
    }

    /// Same region moved so that its top-left corner sits at `(x, y)`.
    pub fn moved_to(&self, x: f32, y: f32) -> Self {
        Self { x1: x, y1: y, x2: x + self.width(), y2: y + self.height() }
    }
}

/// Integer rectangle, used for scroll viewports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IRegion {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl IRegion {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains_is_half_open() {
        let r = Region::new(20.0, 20.0, 30.0, 30.0);
        assert!(r.contains([20.0, 20.0]));
        assert!(r.contains([25.0, 25.0]));
        assert!(!r.contains([30.0, 25.0]));
        assert!(!r.contains([15.0, 15.0]));
    }

    #[test]
    fn test_region_area() {
        assert!(Region::sized(1.0, 1.0).has_area());
        assert!(!Region::new(5.0, 5.0, 5.0, 10.0).has_area());
        assert!(!Region::new(5.0, 5.0, 2.0, 10.0).has_area());
    }

    #[test]
    fn test_transform_roundtrip_translation() {
        let t = Transform2D::translate(10.0, -4.0).concat(Transform2D::translate(1.0, 1.0));
        assert!(t.is_translation());
        assert_eq!(t.apply([0.0, 0.0]), [11.0, -3.0]);
        assert_eq!(t.inverse_apply([11.0, -3.0]), Some([0.0, 0.0]));
    }

    #[test]
    fn test_map_rect_scaled() {
        let t = Transform2D::translate(5.0, 5.0).concat(Transform2D::scale(2.0, 2.0));
        let r = t.map_rect(Rect::new(1.0, 1.0, 2.0, 3.0));
        assert_eq!(r, Rect::new(7.0, 7.0, 4.0, 6.0));
    }

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersect(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersect(&Rect::new(20.0, 20.0, 1.0, 1.0)), None);
    }
}
