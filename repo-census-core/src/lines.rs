//! Line counting with consistent terminator semantics.

/// Number of lines in `text`.
///
/// Every line-break sequence (`\r\n`, `\n` or a lone `\r`) ends one line, and a
/// non-empty unterminated tail counts as one more. Empty input has zero lines.
pub fn count_lines(text: &str) -> u64 {
    let bytes = text.as_bytes();
    let mut lines = 0u64;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => lines += 1,
            _ => {}
        }
        i += 1;
    }
    match bytes.last() {
        Some(b'\n') | Some(b'\r') | None => lines,
        Some(_) => lines + 1,
    }
}
