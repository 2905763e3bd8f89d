//! Text metrics and word wrapping
//!
//! The planner sizes boxes with these functions and the renderer recomputes
//! the exact same layout when drawing, so what was measured is what is drawn.
//! Box sizing uses an average glyph width; every laid-out line is then
//! checked against the Helvetica / Helvetica-Bold AFM widths and cut if it
//! would run past the text area.

/// Average glyph advance as a fraction of the font size
pub const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// Inset of the white text-safe rectangle from the box edge
pub const SAFE_INSET: f64 = 4.0;
/// Inset of the text from the text-safe rectangle edge
pub const TEXT_PADDING: f64 = 6.0;
/// Appended to the last visible line when text overflows its box
pub const ELLIPSIS: &str = "...";

const EDGE: f64 = SAFE_INSET + TEXT_PADDING;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

/// Weight of the standard font a line is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// Advance width of `c` in 1/1000 em.
///
/// Latin-1 letters use an upper bound for their case; anything else counts
/// as a full em.
fn glyph_width(c: char, weight: FontWeight) -> f64 {
    let table = match weight {
        FontWeight::Regular => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let width = match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ if c == 'æ' => 889,
        _ if c == 'Æ' => 1000,
        0xC0..=0xDE => 778,
        0xDF..=0xFF => 611,
        _ => 1000,
    };
    f64::from(width)
}

/// Rendered width of `text` in points
pub fn measure(text: &str, font_size: f64, weight: FontWeight) -> f64 {
    text.chars().map(|c| glyph_width(c, weight)).sum::<f64>() * font_size / 1000.0
}

/// Cut `line` so that it is at most `max_width` wide, appending the ellipsis
/// when anything was removed
pub fn fit_line(line: &str, max_width: f64, font_size: f64, weight: FontWeight) -> String {
    if measure(line, font_size, weight) <= max_width {
        return line.to_string();
    }
    let mut cut: Vec<char> = line.chars().collect();
    while !cut.is_empty() {
        cut.pop();
        let mut candidate: String = cut.iter().collect();
        candidate.truncate(candidate.trim_end().len());
        candidate.push_str(ELLIPSIS);
        if measure(&candidate, font_size, weight) <= max_width {
            return candidate;
        }
    }
    String::new()
}

pub fn line_height(font_size: f64) -> f64 {
    font_size + 2.0
}

/// Width available to text inside a box of `box_width`
pub fn text_width(box_width: f64) -> f64 {
    (box_width - 2.0 * EDGE).max(0.0)
}

/// Box width needed to show a line of `chars` characters
pub fn box_width_for(chars: usize, font_size: f64) -> f64 {
    chars as f64 * font_size * CHAR_WIDTH_FACTOR + 2.0 * EDGE
}

/// Box height needed to show `lines` lines
pub fn box_height_for(lines: usize, font_size: f64) -> f64 {
    lines as f64 * line_height(font_size) + 2.0 * EDGE
}

/// How many characters fit on one line of a box
pub fn chars_per_line(box_width: f64, font_size: f64) -> usize {
    let per_char = font_size * CHAR_WIDTH_FACTOR;
    if per_char <= 0.0 {
        return 1;
    }
    ((text_width(box_width) / per_char).floor() as usize).max(1)
}

/// How many lines fit vertically in a box
pub fn max_lines(box_height: f64, font_size: f64) -> usize {
    let available = box_height - 2.0 * EDGE;
    if available <= 0.0 {
        return 0;
    }
    (available / line_height(font_size)).floor() as usize
}

/// Greedy word wrap to at most `max_chars` characters per line.
///
/// Words longer than a line are split across lines.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(max_chars).peekable();
            while let Some(chunk) = chunks.next() {
                let piece: String = chunk.iter().collect();
                if chunks.peek().is_some() {
                    lines.push(piece);
                } else {
                    current_len = chunk.len();
                    current = piece;
                }
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrapped text as it will be drawn inside a box
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: f64,
    pub lines: Vec<String>,
    /// True when lines were dropped and an ellipsis appended
    pub truncated: bool,
}

impl TextLayout {
    /// Wrap `text` for a box and cut it to the lines that fit its height
    pub fn for_box(text: &str, box_width: f64, box_height: f64, font_size: f64) -> Self {
        let max_chars = chars_per_line(box_width, font_size);
        let mut lines = wrap(text, max_chars);
        let visible = max_lines(box_height, font_size);
        let mut truncated = false;

        if lines.len() > visible {
            lines.truncate(visible);
            if let Some(last) = lines.last_mut() {
                let ellipsis_len = ELLIPSIS.chars().count();
                let keep = max_chars.saturating_sub(ellipsis_len);
                let mut cut: String = last.chars().take(keep).collect();
                cut.truncate(cut.trim_end().len());
                cut.push_str(ELLIPSIS);
                *last = cut;
            }
            truncated = true;
        }

        // the first line may be drawn bold
        let available = text_width(box_width);
        for (i, line) in lines.iter_mut().enumerate() {
            let weight = if i == 0 {
                FontWeight::Bold
            } else {
                FontWeight::Regular
            };
            let fitted = fit_line(line, available, font_size, weight);
            if fitted != *line {
                *line = fitted;
                truncated = true;
            }
        }

        Self {
            font_size,
            lines,
            truncated,
        }
    }

    pub fn line_height(&self) -> f64 {
        line_height(self.font_size)
    }

    /// Baseline offsets from the box top, one per line
    pub fn baselines(&self) -> Vec<f64> {
        (0..self.lines.len())
            .map(|i| EDGE + self.font_size + i as f64 * self.line_height())
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn laid_out_lines_fit_the_text_area(
            text in "[A-Za-z áéñ]{0,200}",
            width in 150.0f64..300.0,
            size in 8.0f64..11.0,
        ) {
            let layout = TextLayout::for_box(&text, width, 200.0, size);
            for (i, line) in layout.lines.iter().enumerate() {
                let weight = if i == 0 { FontWeight::Bold } else { FontWeight::Regular };
                prop_assert!(measure(line, size, weight) <= text_width(width) + 1e-9);
            }
        }
    }
}
