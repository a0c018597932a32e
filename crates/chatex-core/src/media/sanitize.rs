//! Filesystem-safe media filenames.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

fn is_replaced(c: char) -> bool {
    c == '\0' || c == '/' || c == '\\' || c.is_control()
}

fn is_trimmed(c: char) -> bool {
    c.is_whitespace() || c == '.'
}

/// Makes a media filename safe to join onto the download directory.
///
/// - Replaces NUL, `/`, `\` and control characters with `_`
/// - Collapses runs of replaced characters into one `_`
/// - Trims leading/trailing whitespace and dots
/// - Truncates to 255 bytes on a char boundary
///
/// Returns an empty string when nothing usable remains (including `.` and `..`).
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut replaced_last = false;
    let mut kept_any = false;

    for c in name.chars() {
        if is_replaced(c) {
            if !replaced_last {
                out.push('_');
            }
            replaced_last = true;
        } else {
            out.push(c);
            replaced_last = false;
            kept_any |= !is_trimmed(c);
        }
    }

    // Only replacement underscores, dots and whitespace: nothing of the name is left.
    if !kept_any {
        return String::new();
    }
    let trimmed = out.trim_matches(is_trimmed);

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
