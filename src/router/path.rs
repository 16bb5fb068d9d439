/// Lexically clean a request path.
///
/// - repeated `/` collapse into one
/// - `.` elements are dropped
/// - `..` removes the preceding element and never climbs above the root
///
/// The result always starts with `/`. A trailing slash survives, including one
/// implied by a final `.` element (`/a/.` becomes `/a/`); a final `..` does
/// not keep one.
#[must_use]
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    for part in &parts {
        out.push('/');
        out.push_str(part);
    }
    let trailing = path.ends_with('/') || path.ends_with("/.") || path == ".";
    if out.is_empty() || trailing {
        out.push('/');
    }
    out
}
