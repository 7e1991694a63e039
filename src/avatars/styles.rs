//! The three avatar looks. Each renderer draws one picture from an RNG; the
//! RNG is the only source of variation.

use super::draw::{Canvas, Color};
use rand::Rng;
use rand::rngs::StdRng;

const BACKGROUNDS: &[Color] = &[
    [178, 223, 219],
    [255, 224, 178],
    [209, 196, 233],
    [200, 230, 201],
    [255, 205, 210],
    [187, 222, 251],
    [240, 244, 195],
];

const SKIN: &[Color] = &[
    [255, 219, 180],
    [237, 185, 138],
    [208, 139, 91],
    [174, 93, 41],
    [97, 68, 39],
];

const HAIR: &[Color] = &[
    [44, 27, 24],
    [113, 65, 40],
    [181, 130, 72],
    [230, 190, 120],
    [165, 42, 42],
    [120, 120, 120],
];

const INK: &[Color] = &[
    [33, 150, 243],
    [233, 30, 99],
    [76, 175, 80],
    [255, 152, 0],
    [103, 58, 183],
    [0, 150, 136],
    [121, 85, 72],
];

const METAL: &[Color] = &[
    [144, 164, 174],
    [255, 193, 7],
    [0, 188, 212],
    [139, 195, 74],
    [244, 67, 54],
    [158, 158, 158],
];

const DARK: Color = [40, 40, 48];
const WHITE: Color = [250, 250, 250];

fn pick(rng: &mut StdRng, palette: &[Color]) -> Color {
    palette[rng.gen_range(0..palette.len())]
}

/// Cartoon face: hair, head, eyes, brows, mouth.
pub fn caricature(canvas_size: u32, rng: &mut StdRng) -> Canvas {
    let mut c = Canvas::new(canvas_size, pick(rng, BACKGROUNDS));
    let skin = pick(rng, SKIN);
    let hair = pick(rng, HAIR);

    // Shoulders.
    let shirt = pick(rng, INK);
    c.ellipse(0.5, 1.05, 0.38, 0.24, shirt);
    c.rect(0.43, 0.72, 0.14, 0.12, skin);

    match rng.gen_range(0..4) {
        // Long hair falls behind the head.
        0 => c.rounded_rect(0.2, 0.22, 0.6, 0.6, 0.12, hair),
        // Afro.
        1 => c.circle(0.5, 0.4, 0.31, hair),
        _ => {}
    }

    c.ellipse(0.5, 0.5, 0.25, 0.29, skin);
    // Ears.
    c.circle(0.25, 0.52, 0.045, skin);
    c.circle(0.75, 0.52, 0.045, skin);

    match rng.gen_range(0..3) {
        0 => c.ellipse(0.5, 0.27, 0.25, 0.1, hair),
        1 => {
            c.ellipse(0.5, 0.28, 0.26, 0.12, hair);
            c.rect(0.24, 0.28, 0.06, 0.14, hair);
            c.rect(0.7, 0.28, 0.06, 0.14, hair);
        }
        _ => {}
    }

    let eye_y = 0.48 + rng.gen_range(-0.02f32..0.02);
    let spread = rng.gen_range(0.09f32..0.12);
    let eye_r = rng.gen_range(0.025f32..0.04);
    for side in [-1.0f32, 1.0] {
        let x = 0.5 + side * spread;
        c.circle(x, eye_y, eye_r * 1.6, WHITE);
        c.circle(x, eye_y, eye_r, DARK);
        if rng.gen_bool(0.7) {
            c.rect(x - 0.05, eye_y - 0.08, 0.1, 0.018, hair);
        }
    }

    if rng.gen_bool(0.4) {
        for side in [-1.0f32, 1.0] {
            c.circle(0.5 + side * 0.16, 0.6, 0.035, [240, 128, 128]);
        }
    }

    c.ellipse(0.5, 0.56, 0.022, 0.03, darken(skin));

    let mouth_w = rng.gen_range(0.06f32..0.11);
    if rng.gen_bool(0.75) {
        c.lower_half_ellipse(0.5, 0.63, mouth_w, mouth_w * 0.7, [160, 40, 60]);
    } else {
        c.rect(0.5 - mouth_w / 2.0, 0.65, mouth_w, 0.015, [120, 40, 50]);
    }

    if rng.gen_bool(0.25) {
        c.lower_half_ellipse(0.5, 0.6, 0.2, 0.18, hair);
        c.lower_half_ellipse(0.5, 0.63, mouth_w, mouth_w * 0.7, [160, 40, 60]);
    }
    c
}

/// Mirrored 8×8 blocks in two colours.
pub fn pixel_art(canvas_size: u32, rng: &mut StdRng) -> Canvas {
    const GRID: usize = 8;
    let mut c = Canvas::new(canvas_size, pick(rng, BACKGROUNDS));
    let main = pick(rng, INK);
    let accent = pick(rng, HAIR);
    let cell = 1.0 / GRID as f32;

    for row in 0..GRID {
        for col in 0..GRID / 2 {
            if !rng.gen_bool(0.5) {
                continue;
            }
            let color = if rng.gen_bool(0.2) { accent } else { main };
            for mirrored in [col, GRID - 1 - col] {
                c.rect(mirrored as f32 * cell, row as f32 * cell, cell, cell, color);
            }
        }
    }
    c
}

/// Boxy robot head: antenna, face plate, eyes, mouth grille.
pub fn robot(canvas_size: u32, rng: &mut StdRng) -> Canvas {
    let mut c = Canvas::new(canvas_size, pick(rng, BACKGROUNDS));
    let body = pick(rng, METAL);
    let trim = darken(body);

    c.rect(0.485, 0.1, 0.03, 0.14, trim);
    c.circle(0.5, 0.1, 0.04, pick(rng, INK));

    c.rect(0.15, 0.42, 0.06, 0.16, trim);
    c.rect(0.79, 0.42, 0.06, 0.16, trim);

    let radius = rng.gen_range(0.02f32..0.12);
    c.rounded_rect(0.2, 0.22, 0.6, 0.56, radius, body);
    c.rounded_rect(0.27, 0.3, 0.46, 0.24, 0.04, DARK);

    let glow = pick(rng, INK);
    if rng.gen_bool(0.5) {
        c.circle(0.39, 0.42, 0.055, glow);
        c.circle(0.61, 0.42, 0.055, glow);
    } else {
        c.rect(0.32, 0.38, 0.12, 0.07, glow);
        c.rect(0.56, 0.38, 0.12, 0.07, glow);
    }

    let bars: u32 = rng.gen_range(3..7);
    let width = 0.3f32;
    let step = width / bars as f32;
    c.rect(0.35, 0.6, width, 0.1, DARK);
    for i in 0..bars {
        c.rect(0.35 + i as f32 * step + step * 0.25, 0.62, step * 0.5, 0.06, WHITE);
    }
    c
}

fn darken(c: Color) -> Color {
    c.map(|channel| (u16::from(channel) * 3 / 4) as u8)
}
