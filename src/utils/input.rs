//! Input sanitizing for pasted text.

/// Normalize pasted text before it enters the editor: CRLF and bare CR
/// become LF, tabs expand to four spaces, and remaining control characters
/// are dropped so they cannot corrupt the terminal.
pub fn sanitize_paste(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .chars()
        .fold(String::with_capacity(normalized.len()), |mut out, c| {
            match c {
                '\t' => out.push_str("    "),
                '\n' => out.push('\n'),
                c if !c.is_control() => out.push(c),
                _ => {}
            }
            out
        })
}
