// Keyboard -> commands. Stands in for the colour picker, sliders and buttons.
//
//   Space  start/stop real-time segmentation     S  segment once
//   C      next polish colour                    X  clear mask
//   Up/Dn  intensity    G/H  glossiness    M/N  metallic     (+/- 5%)
//   [ / ]  segmentation interval -/+ 100ms       Esc quit

use crate::draw::Drawer;
use minifb::Key;

/// Slider step for the look controls.
pub const PARAM_STEP: f32 = 0.05;
/// Interval step for `[` / `]`.
pub const INTERVAL_STEP_MS: i64 = 100;

/// Polish shades cycled by `C`.
pub const PALETTE: [[f32; 3]; 6] = [
    [0.76, 0.09, 0.36], // #c2185b
    [0.83, 0.18, 0.18], // classic red
    [0.98, 0.55, 0.64], // pastel pink
    [0.29, 0.08, 0.55], // plum
    [0.05, 0.28, 0.63], // navy
    [0.85, 0.65, 0.13], // gold
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ToggleRealtime,
    SegmentOnce,
    NextColor,
    ClearMask,
    Intensity(f32),
    Glossiness(f32),
    Metallic(f32),
    IntervalBy(i64),
    Quit,
}

/// Everything pressed since the last poll, in a stable order.
pub fn poll(drawer: &Drawer) -> Vec<Command> {
    let mut out = Vec::new();
    if drawer.key_down(Key::Escape) {
        out.push(Command::Quit);
    }

    let once = [
        (Key::Space, Command::ToggleRealtime),
        (Key::S, Command::SegmentOnce),
        (Key::C, Command::NextColor),
        (Key::X, Command::ClearMask),
        (Key::LeftBracket, Command::IntervalBy(-INTERVAL_STEP_MS)),
        (Key::RightBracket, Command::IntervalBy(INTERVAL_STEP_MS)),
    ];
    for (key, cmd) in once {
        if drawer.key_pressed_once(key) {
            out.push(cmd);
        }
    }

    let held = [
        (Key::Up, Command::Intensity(PARAM_STEP)),
        (Key::Down, Command::Intensity(-PARAM_STEP)),
        (Key::G, Command::Glossiness(PARAM_STEP)),
        (Key::H, Command::Glossiness(-PARAM_STEP)),
        (Key::M, Command::Metallic(PARAM_STEP)),
        (Key::N, Command::Metallic(-PARAM_STEP)),
    ];
    for (key, cmd) in held {
        if drawer.key_pressed_repeat(key) {
            out.push(cmd);
        }
    }
    out
}

/// Index of the palette entry after the one closest to `color`.
pub fn next_palette_index(color: [f32; 3]) -> usize {
    let dist = |p: &[f32; 3]| (0..3).map(|i| (p[i] - color[i]).powi(2)).sum::<f32>();
    let closest = PALETTE
        .iter()
        .enumerate()
        .min_by(|a, b| dist(a.1).total_cmp(&dist(b.1)))
        .map_or(0, |(i, _)| i);
    (closest + 1) % PALETTE.len()
}
