// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises one corpus line before tokenisation.
//
// Corpus files are exported from many tools and carry:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Byte order marks (U+FEFF) at the start of the first line
//   - Tabs and stray control characters
//   - Runs of spaces around punctuation
//
// Each line is cleaned on its own and always yields exactly one
// sentence, even if that sentence ends up empty. Dropping or
// merging lines would shift every later sentence out of
// alignment with the other language.
//
// Zero-width joiners (U+200D) and non-joiners (U+200C) are kept:
// Indic scripts use them inside words.
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single line of corpus text.
    pub fn clean_sentence(&self, line: &str) -> String {
        let mut out        = String::with_capacity(line.len());
        let mut last_space = true; // swallows leading spaces

        for c in line.chars() {
            let c = match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                '\r' | '\n' => ' ',
                c if c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space survives the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
