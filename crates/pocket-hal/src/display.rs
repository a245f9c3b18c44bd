/// Character cell width of the panel's built-in font.
pub const GLYPH_W: i32 = 8;

pub trait Display {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn clear(&mut self);
    fn draw_text(&mut self, x: i32, y: i32, text: &str);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32);
    fn draw_pixel(&mut self, x: i32, y: i32);
    /// Push the back buffer to the panel.
    fn present(&mut self);

    fn set_contrast(&mut self, level: u8);
    fn set_inverted(&mut self, inverted: bool);
    fn power_on(&mut self);
    fn power_off(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
    texts: Vec<TextSpan>,
    contrast: u8,
    inverted: bool,
    powered: bool,
    presented: u64,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
            texts: Vec::new(),
            contrast: 1,
            inverted: false,
            powered: true,
            presented: 0,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.index(x, y).map(|i| self.pixels[i]).unwrap_or(false)
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    pub fn texts(&self) -> &[TextSpan] {
        &self.texts
    }

    /// True if any text span on screen contains `needle`.
    pub fn shows(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
    }

    pub fn contrast(&self) -> u8 { self.contrast }
    pub fn inverted(&self) -> bool { self.inverted }
    pub fn powered(&self) -> bool { self.powered }
    pub fn presented(&self) -> u64 { self.presented }

    /// Render the buffer as text, two pixel rows per character row.
    pub fn to_ascii(&self) -> String {
        let cols = self.width as usize;
        let rows = (self.height as usize).div_ceil(2);
        let mut grid = vec![vec![' '; cols]; rows];

        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.pixel(x, y) {
                    grid[(y / 2) as usize][x as usize] = '#';
                }
            }
        }
        for span in &self.texts {
            let row = (span.y / 2) as usize;
            if span.y < 0 || row >= rows {
                continue;
            }
            for (i, ch) in span.text.chars().enumerate() {
                let col = span.x as usize + i;
                if span.x < 0 || col >= cols {
                    break;
                }
                grid[row][col] = ch;
            }
        }

        let mut out = String::with_capacity((cols + 1) * rows);
        for line in grid {
            out.extend(line.iter().map(|c| if self.inverted && *c == ' ' { '.' } else { *c }));
            out.push('\n');
        }
        out
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl Display for FrameBuffer {
    fn width(&self) -> u32 { self.width }
    fn height(&self) -> u32 { self.height }

    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
        self.texts.clear();
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.texts.push(TextSpan { x, y, text: text.to_string() });
    }

    // Bresenham; out-of-range points are dropped per pixel.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.draw_pixel(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_pixel(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = true;
        }
    }

    fn present(&mut self) {
        if self.powered {
            self.presented += 1;
        }
    }

    fn set_contrast(&mut self, level: u8) { self.contrast = level; }
    fn set_inverted(&mut self, inverted: bool) { self.inverted = inverted; }
    fn power_on(&mut self) { self.powered = true; }
    fn power_off(&mut self) { self.powered = false; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_covers_both_endpoints() {
        let mut fb = FrameBuffer::new(16, 8);
        fb.draw_line(0, 0, 15, 7);
        assert!(fb.pixel(0, 0));
        assert!(fb.pixel(15, 7));
        assert!(fb.lit_pixels() >= 16);
    }

    #[test]
    fn out_of_range_pixels_are_ignored() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.draw_pixel(-1, 0);
        fb.draw_pixel(4, 4);
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn clear_drops_text_and_pixels() {
        let mut fb = FrameBuffer::new(8, 8);
        fb.draw_text(0, 0, "Fix: Valid");
        fb.draw_pixel(1, 1);
        assert!(fb.shows("Valid"));
        fb.clear();
        assert!(!fb.shows("Valid"));
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn present_is_not_counted_while_powered_off() {
        let mut fb = FrameBuffer::new(8, 8);
        fb.present();
        fb.power_off();
        fb.present();
        assert_eq!(fb.presented(), 1);
    }

    #[test]
    fn ascii_dump_overlays_text() {
        let mut fb = FrameBuffer::new(12, 4);
        fb.draw_text(0, 2, "No data");
        let ascii = fb.to_ascii();
        assert_eq!(ascii.lines().count(), 2);
        assert!(ascii.lines().nth(1).unwrap().starts_with("No data"));
    }
}
