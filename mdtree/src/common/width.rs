//! Display width of text, aware of East Asian scripts.
//!
//! Table columns are justified by what a monospace editor shows, not by byte or char count:
//! CJK ideographs, kana, hangul and full-width punctuation occupy two cells.

use unicode_script::{Script, UnicodeScript};

/// Whether `c` belongs to a CJK script (ideographs, kana or hangul).
pub fn is_cjk(c: char) -> bool {
    matches!(
        c.script(),
        Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul
    )
}

fn is_fullwidth_symbol(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F | 0xFF01..=0xFF60 | 0xFFE0..=0xFFE6 | 0x1F300..=0x1FAFF
    )
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{FE00}'..='\u{FE0F}' | '\u{FEFF}')
        || c.is_control()
}

/// Width of a single char in monospace cells.
pub fn char_width(c: char) -> usize {
    if is_zero_width(c) {
        0
    } else if is_cjk(c) || is_fullwidth_symbol(c) {
        2
    } else {
        1
    }
}

/// Width of `text` in monospace cells.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}
