mod macros;
mod lazy_result;

pub use macros::*;
pub use lazy_result::*;

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        // Control whitespace transliterates to nothing but separates words.
        let ascii = match deunicode::deunicode_char(ch) {
            _ if ch.is_whitespace() => "-",
            Some(ascii) => ascii,
            None => "-",
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }

    output
}

/// Returns `true` if `path` has a scheme part, as in `http://host/` or
/// `mailto:me@host` (RFC 1738: `^\w[a-zA-Z0-9+.-]*:`).
///
/// ```
/// use kestrel::util::is_absolute_url;
///
/// assert!(is_absolute_url("http://example.com/"));
/// assert!(is_absolute_url("mailto:me@example.com"));
/// assert!(!is_absolute_url("/index.html"));
/// assert!(!is_absolute_url("file.html#a:b"));
/// assert!(!is_absolute_url(":nothing"));
/// ```
pub fn is_absolute_url(path: &str) -> bool {
    let bytes = path.as_bytes();
    match bytes.first() {
        Some(c) if c.is_ascii_alphanumeric() || *c == b'_' => (),
        _ => return false,
    }

    for &c in &bytes[1..] {
        match c {
            b':' => return true,
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'+' | b'.' | b'-' => continue,
            _ => return false,
        }
    }

    false
}

/// The 1-based line of the byte at `offset` in `string`.
pub fn line_at(string: &str, offset: usize) -> usize {
    let offset = offset.min(string.len());
    memchr::memchr_iter(b'\n', &string.as_bytes()[..offset]).count() + 1
}
