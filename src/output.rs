//! CLI output formatting.
//!
//! Every view has a `format_*` function returning lines, so the text can be
//! tested without capturing stdout, and a `print_*` wrapper that writes them.
//! Labels go through the [`Translator`], so the CLI speaks the same language
//! as the stored preference.
//!
//! # Output Format
//!
//! ## Avatar
//!
//! ```text
//! Avatar 480x480 image/png (212.4 KB)
//!     Hash: 9f2c41d07a3b
//! ```
//!
//! ## Generated batch
//!
//! ```text
//! Robots (12)
//! 001 3kq0z81mfa  128x128
//! 002 b71xw0c9pe  128x128
//! ```
//!
//! ## Notices
//!
//! ```text
//! ✓ Picture saved.
//! ✗ Select a valid image.
//! ```

use crate::avatars::{GeneratedAvatar, Style};
use crate::editor::{EditorError, EditorState, Notice, NoticeLevel};
use crate::locale::{Language, Translator};
use crate::types::AvatarImage;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// Avatar
// ============================================================================

pub fn format_avatar(current: Option<&AvatarImage>, t: &Translator) -> Vec<String> {
    match current {
        None => vec![t.t("noAvatar").to_string()],
        Some(image) => {
            let hash = image.content_hash();
            vec![
                format!(
                    "{} {} {} ({})",
                    t.t("avatar"),
                    image.dimensions(),
                    image.mime_type(),
                    format_size(image.bytes().len())
                ),
                format!("{}Hash: {}", indent(1), &hash[..12.min(hash.len())]),
            ]
        }
    }
}

pub fn print_avatar(current: Option<&AvatarImage>, t: &Translator) {
    for line in format_avatar(current, t) {
        println!("{}", line);
    }
}

// ============================================================================
// Generated batch
// ============================================================================

pub fn format_generated(style: Style, options: &[GeneratedAvatar], t: &Translator) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", t.t(style.label_key()), options.len())];
    for (i, option) in options.iter().enumerate() {
        lines.push(format!(
            "{} {}  {}",
            format_index(i + 1),
            option.seed,
            option.image.dimensions()
        ));
    }
    lines
}

pub fn print_generated(style: Style, options: &[GeneratedAvatar], t: &Translator) {
    for line in format_generated(style, options, t) {
        println!("{}", line);
    }
}

// ============================================================================
// Editor state and notices
// ============================================================================

pub fn format_notices(notices: &[Notice]) -> Vec<String> {
    notices
        .iter()
        .map(|n| match n.level {
            NoticeLevel::Success => format!("✓ {}", n.message),
            NoticeLevel::Error => format!("✗ {}", n.message),
        })
        .collect()
}

pub fn print_notices(notices: &[Notice]) {
    for line in format_notices(notices) {
        println!("{}", line);
    }
}

/// One-line state summary, with crop details while reviewing.
pub fn format_state(state: &EditorState, t: &Translator) -> Vec<String> {
    let mut lines = vec![format!("State: {}", state)];
    match state {
        EditorState::ReviewCrop { image, stage, .. } => {
            lines.push(format!("{}Source: {}", indent(1), image.dimensions()));
            lines.push(format!(
                "{}{}: {:.2} / {:.2}",
                indent(1),
                t.t("zoom"),
                stage.zoom(),
                stage.max_zoom()
            ));
            lines.push(format!("{}Region: {}", indent(1), stage.current_region()));
        }
        EditorState::GeneratedPicker { style, options } => {
            lines.push(format!(
                "{}{}: {} ({})",
                indent(1),
                t.t("chooseAvatar"),
                t.t(style.label_key()),
                options.len()
            ));
        }
        _ => {}
    }
    lines
}

/// Translated message for an editor failure, with the technical detail.
pub fn format_error(err: &EditorError, t: &Translator) -> String {
    match err.message_key() {
        Some(key) => format!("{} ({})", t.t(key), err),
        None => err.to_string(),
    }
}

// ============================================================================
// Languages
// ============================================================================

/// Languages in selector order, the active one marked.
pub fn format_languages(active: Language) -> Vec<String> {
    Language::ALL
        .iter()
        .map(|&language| {
            let marker = if language == active { "*" } else { " " };
            format!("{} {}", marker, language)
        })
        .collect()
}

pub fn print_languages(active: Language) {
    for line in format_languages(active) {
        println!("{}", line);
    }
}
