// src/render/ansi.rs

//! ANSI SGR colouring and escape-aware line truncation.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

pub const RESET: &str = "\x1b[0m";

const ELLIPSIS: &str = "...";

static SGR_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid SGR pattern"));

/// The eight basic terminal foreground colours.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    fn fg_code(&self) -> u8 {
        30 + match self {
            Color::Black => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Yellow => 3,
            Color::Blue => 4,
            Color::Magenta => 5,
            Color::Cyan => 6,
            Color::White => 7,
        }
    }

    pub fn escape(&self) -> String {
        format!("\x1b[{}m", self.fg_code())
    }
}

/// Wrap `text` in a colour, followed by a full reset.
pub fn paint(color: Color, text: &str) -> String {
    format!("{}{}{}", color.escape(), text, RESET)
}

/// [`paint`] when `enabled`, plain text otherwise.
pub fn paint_if(enabled: bool, color: Color, text: &str) -> String {
    if enabled {
        paint(color, text)
    } else {
        text.to_string()
    }
}

/// Green for a zero exit code, red for anything else.
pub fn status_color(exit_code: i32) -> Color {
    if exit_code == 0 { Color::Green } else { Color::Red }
}

/// Number of characters a terminal would display (SGR escapes excluded).
pub fn visible_len(line: &str) -> usize {
    if !line.contains('\x1b') {
        return line.chars().count();
    }
    SGR_ESCAPE.replace_all(line, "").chars().count()
}

/// Cut a line longer than `width` characters to `width - 3` plus `...`.
/// Below three columns the ellipsis itself is shortened to fit.
pub fn truncate_plain(line: &str, width: usize) -> Cow<'_, str> {
    if line.chars().count() <= width {
        return Cow::Borrowed(line);
    }
    let kept: String = line.chars().take(width.saturating_sub(ELLIPSIS.len())).collect();
    Cow::Owned(kept + ellipsis(width))
}

fn ellipsis(width: usize) -> &'static str {
    &ELLIPSIS[..width.min(ELLIPSIS.len())]
}

/// Like [`truncate_plain`], but only visible characters count towards
/// `width`. Escapes inside the kept part are preserved, and a reset is
/// appended when the line carried any.
pub fn truncate_visible(line: &str, width: usize) -> Cow<'_, str> {
    if visible_len(line) <= width {
        return Cow::Borrowed(line);
    }

    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut out = String::with_capacity(line.len());
    let mut shown = 0;
    let mut saw_escape = false;
    let mut last = 0;
    let mut complete = true;

    for m in SGR_ESCAPE.find_iter(line) {
        if !push_visible(&mut out, &line[last..m.start()], &mut shown, keep) {
            complete = false;
            break;
        }
        out.push_str(m.as_str());
        saw_escape = true;
        last = m.end();
    }
    if complete {
        push_visible(&mut out, &line[last..], &mut shown, keep);
    }

    out.push_str(ellipsis(width));
    if saw_escape {
        out.push_str(RESET);
    }
    Cow::Owned(out)
}

/// Append characters of `text` until `keep` visible characters are out.
/// Returns false once the budget ran out before the end of `text`.
fn push_visible(out: &mut String, text: &str, shown: &mut usize, keep: usize) -> bool {
    for c in text.chars() {
        if *shown == keep {
            return false;
        }
        out.push(c);
        *shown += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_truncation_hits_width_exactly() {
        let line = "abcdefghijklmnopqrst";
        let cut = truncate_plain(line, 10);
        assert_eq!(cut, "abcdefg...");
        assert_eq!(cut.chars().count(), 10);
        assert_eq!(truncate_plain("short", 10), "short");
    }

    #[test]
    fn escapes_do_not_count_towards_width() {
        let line = paint(Color::Red, "abcdefghijklmnopqrst");
        let cut = truncate_visible(&line, 10);
        assert_eq!(visible_len(&cut), 10);
        assert_eq!(cut, format!("\x1b[31mabcdefg...{RESET}"));

        // Fits once escapes are discounted.
        let fits = paint(Color::Green, "abcdefghij");
        assert_eq!(truncate_visible(&fits, 10), fits);
    }

    #[test]
    fn escape_in_the_middle_is_kept() {
        let line = format!("ab{}cdefghijklmnop", Color::Blue.escape());
        let cut = truncate_visible(&line, 8);
        assert_eq!(cut, format!("ab{}cde...{RESET}", Color::Blue.escape()));
    }

    #[test]
    fn narrow_widths_never_overflow() {
        for width in 0..3 {
            let cut = truncate_plain("abcdef", width);
            assert_eq!(cut.chars().count(), width);
            let painted = paint(Color::Red, "abcdef");
            let cut = truncate_visible(&painted, width);
            assert_eq!(visible_len(&cut), width);
        }
        assert_eq!(truncate_plain("abcdef", 2), "..");
    }

    #[test]
    fn paint_if_respects_flag() {
        assert_eq!(paint_if(false, Color::Red, "x"), "x");
        assert_eq!(paint_if(true, Color::Red, "x"), "\x1b[31mx\x1b[0m");
        assert_eq!(status_color(0), Color::Green);
        assert_eq!(status_color(-1), Color::Red);
    }
}
