//! Minimal raster primitives for the avatar styles.
//!
//! Coordinates are fractions of the canvas size (`0.0..=1.0`), so every
//! style renders the same picture at any output size. A pixel is painted
//! when its centre falls inside the shape.

use image::{Rgba, RgbaImage};

pub type Color = [u8; 3];

pub struct Canvas {
    img: RgbaImage,
    size: u32,
}

impl Canvas {
    pub fn new(size: u32, background: Color) -> Self {
        Self {
            img: RgbaImage::from_pixel(size, size, opaque(background)),
            size,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.img
    }

    /// Pixel range covering `[from, to)` in unit coordinates, clipped.
    fn span(&self, from: f32, to: f32) -> std::ops::Range<u32> {
        let s = self.size as f32;
        let start = (from * s - 0.5).ceil().max(0.0) as u32;
        let end = ((to * s - 0.5).ceil().max(0.0) as u32).min(self.size);
        start..end.max(start)
    }

    fn centre(&self, px: u32) -> f32 {
        (px as f32 + 0.5) / self.size as f32
    }

    fn paint_where(
        &mut self,
        bounds: (f32, f32, f32, f32),
        color: Color,
        inside: impl Fn(f32, f32) -> bool,
    ) {
        let (x0, y0, x1, y1) = bounds;
        let pixel = opaque(color);
        for py in self.span(y0, y1) {
            let v = self.centre(py);
            for px in self.span(x0, x1) {
                if inside(self.centre(px), v) {
                    self.img.put_pixel(px, py, pixel);
                }
            }
        }
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.paint_where((x, y, x + w, y + h), color, |_, _| true);
    }

    pub fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, color: Color) {
        let r = radius.min(w / 2.0).min(h / 2.0);
        self.paint_where((x, y, x + w, y + h), color, |u, v| {
            let cx = u.clamp(x + r, x + w - r);
            let cy = v.clamp(y + r, y + h - r);
            (u - cx).powi(2) + (v - cy).powi(2) <= r * r
        });
    }

    pub fn ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, color: Color) {
        self.paint_where((cx - rx, cy - ry, cx + rx, cy + ry), color, |u, v| {
            ((u - cx) / rx).powi(2) + ((v - cy) / ry).powi(2) <= 1.0
        });
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32, color: Color) {
        self.ellipse(cx, cy, r, r, color);
    }

    /// Lower half of an ellipse (a smile).
    pub fn lower_half_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, color: Color) {
        self.paint_where((cx - rx, cy, cx + rx, cy + ry), color, |u, v| {
            v >= cy && ((u - cx) / rx).powi(2) + ((v - cy) / ry).powi(2) <= 1.0
        });
    }
}

fn opaque(c: Color) -> Rgba<u8> {
    Rgba([c[0], c[1], c[2], 255])
}
