/// Per-class box colors
///
/// Hues are spread evenly around the color wheel at full saturation and value,
/// then shuffled with a fixed seed so that neighbouring class indices get
/// contrasting colors while staying identical across runs.
use image::Rgb;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed used for the color shuffle. Changing it changes every class color.
pub const COLOR_SEED: u64 = 42;

/// Used when the table is empty
pub const FALLBACK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Rgb<u8>>,
}

impl ColorTable {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    /// Color for a class index, `None` past the end of the table
    pub fn color_for(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).copied()
    }

    /// Color for a class index that may exceed the table; wraps around
    pub fn color_wrapped(&self, index: usize) -> Rgb<u8> {
        if self.colors.is_empty() {
            return FALLBACK_COLOR;
        }
        self.colors[index % self.colors.len()]
    }
}

/// Build the shuffled color table for `num_classes` classes
pub fn build_color_table(num_classes: usize, seed: u64) -> ColorTable {
    let mut colors: Vec<Rgb<u8>> = (0..num_classes)
        .map(|i| hsv_to_rgb(i as f64 / num_classes as f64, 1.0, 1.0))
        .collect();

    // Local generator: nothing outside this call observes the seed
    let mut rng = StdRng::seed_from_u64(seed);
    colors.shuffle(&mut rng);

    ColorTable { colors }
}

/// HSV (all components in 0..=1) to 8-bit RGB
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let sector = (h * 6.0).floor();
        let f = h * 6.0 - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match sector as i64 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };

    let to_u8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}
