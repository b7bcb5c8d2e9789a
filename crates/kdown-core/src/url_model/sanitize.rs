/// Make `name` safe as a single path component: separators, NUL and
/// control characters become `_`, runs of `_` collapse, and leading or
/// trailing dots and whitespace are dropped. Truncated to 255 bytes on a
/// char boundary.
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_replaced() {
        assert_eq!(sanitize_filename("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("x\0\0y"), "x_y");
    }

    #[test]
    fn dots_and_spaces_trimmed() {
        assert_eq!(sanitize_filename("  ..file.txt.. "), "file.txt");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[test]
    fn long_names_cut_on_char_boundary() {
        let long = "é".repeat(200);
        let s = sanitize_filename(&long);
        assert!(s.len() <= 255);
        assert!(s.chars().all(|c| c == 'é'));
    }
}
