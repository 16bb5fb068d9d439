//! Route pattern tokenizer.
//!
//! A pattern is split into alternating literal runs and dynamic segments:
//!
//! | Syntax            | Segment                                          |
//! |-------------------|--------------------------------------------------|
//! | `:name`           | named parameter, runs to the next `/`            |
//! | `{name}`          | named parameter, may be followed by a literal    |
//! | `{name:regexp}`   | parameter constrained by an anchored regex       |
//! | `*`, `*name`      | catch-all, must end the pattern                  |
//! | `{*name}`         | catch-all, must end the pattern                  |
//!
//! A backslash escapes `:`, `*`, `{`, `}` and `\` inside literal text.

use regex::Regex;
use std::sync::Arc;

use super::error::RouteError;

/// Key used for an unnamed `*` catch-all.
pub const CATCH_ALL_KEY: &str = "*";

/// How a dynamic segment captures path bytes.
#[derive(Debug, Clone)]
pub enum SegmentKind {
    /// Capture up to the tail byte (or `/`).
    Param,
    /// Like [`SegmentKind::Param`], then the capture must fully match.
    Regex {
        /// Anchored, compiled expression
        regex: Regex,
        /// Expression as written in the pattern
        source: Box<str>,
    },
    /// Capture the rest of the path, separators included.
    CatchAll,
}

/// One dynamic segment of a pattern.
#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Parameter key reported in [`Param::key`](super::Param)
    pub name: Arc<str>,
    /// Byte that terminates the capture: the next literal byte, `/` by default
    pub tail: u8,
    /// The segment exactly as written, e.g. `{id:[0-9]+}`
    pub raw: Box<str>,
}

#[derive(Debug, Clone)]
pub enum Token {
    Literal(String),
    Dynamic(Segment),
}

/// A tokenized route pattern.
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    pub pattern: Arc<str>,
    pub tokens: Vec<Token>,
    /// Parameter keys in declaration order
    pub keys: Vec<Arc<str>>,
}

impl ParsedPattern {
    /// `true` when the pattern has no dynamic segment at all.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.keys.is_empty()
    }

    /// The unescaped literal text of a static pattern.
    #[must_use]
    pub fn literal(&self) -> Option<String> {
        if !self.is_static() {
            return None;
        }
        let mut out = String::with_capacity(self.pattern.len());
        for token in &self.tokens {
            if let Token::Literal(text) = token {
                out.push_str(text);
            }
        }
        Some(out)
    }
}

/// Tokenize `pattern`, validating it and compiling any regex segments.
///
/// # Errors
///
/// [`RouteError::InvalidPattern`] for malformed syntax and
/// [`RouteError::RegexCompileError`] for a bad `{name:regexp}` body.
pub fn parse(pattern: &str) -> Result<ParsedPattern, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::invalid(pattern, "pattern must begin with '/'"));
    }

    let bytes = pattern.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut keys: Vec<Arc<str>> = Vec::new();
    let mut literal = String::new();
    // a path segment may hold at most one dynamic marker
    let mut dynamic_in_segment = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\\' if matches!(bytes.get(i + 1), Some(b':' | b'*' | b'{' | b'}' | b'\\')) => {
                literal.push(bytes[i + 1] as char);
                i += 2;
            }
            b'/' => {
                dynamic_in_segment = false;
                literal.push('/');
                i += 1;
            }
            b'}' => {
                return Err(RouteError::invalid(pattern, format!("unbalanced '}}' at byte {i}")));
            }
            b':' | b'*' | b'{' => {
                if dynamic_in_segment {
                    return Err(RouteError::invalid(
                        pattern,
                        "only one dynamic segment is allowed per path segment",
                    ));
                }
                dynamic_in_segment = true;

                let (raw_end, kind, name) = match c {
                    b':' => {
                        let end = segment_end(bytes, i + 1);
                        let name = &pattern[i + 1..end];
                        check_name(pattern, name)?;
                        (end, SegmentKind::Param, name)
                    }
                    b'*' => {
                        let end = segment_end(bytes, i + 1);
                        let name = &pattern[i + 1..end];
                        if name.bytes().any(is_marker) {
                            return Err(RouteError::invalid(
                                pattern,
                                "only one dynamic segment is allowed per path segment",
                            ));
                        }
                        let name = if name.is_empty() { CATCH_ALL_KEY } else { name };
                        (end, SegmentKind::CatchAll, name)
                    }
                    _ => {
                        let close = matching_brace(bytes, i).ok_or_else(|| {
                            RouteError::invalid(pattern, format!("unbalanced '{{' at byte {i}"))
                        })?;
                        let body = &pattern[i + 1..close];
                        let (kind, name) = parse_braced(pattern, body)?;
                        (close + 1, kind, name)
                    }
                };

                if matches!(kind, SegmentKind::CatchAll) && raw_end != bytes.len() {
                    return Err(RouteError::invalid(
                        pattern,
                        "catch-all segment must be the final segment of the pattern",
                    ));
                }
                if keys.iter().any(|k| k.as_ref() == name) {
                    return Err(RouteError::invalid(
                        pattern,
                        format!("duplicate parameter name '{name}'"),
                    ));
                }

                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                let name: Arc<str> = Arc::from(name);
                keys.push(Arc::clone(&name));
                tokens.push(Token::Dynamic(Segment {
                    kind,
                    name,
                    // patched below once the following literal is known
                    tail: b'/',
                    raw: pattern[i..raw_end].into(),
                }));
                i = raw_end;
            }
            _ => {
                // copy a whole UTF-8 run up to the next special byte
                let start = i;
                i += 1;
                while i < bytes.len() && !matches!(bytes[i], b'\\' | b'/' | b'}' | b':' | b'*' | b'{')
                {
                    i += 1;
                }
                literal.push_str(&pattern[start..i]);
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    // tail byte: first byte of the literal that follows a dynamic segment
    for idx in 0..tokens.len() {
        let next = match tokens.get(idx + 1) {
            Some(Token::Literal(text)) => text.as_bytes().first().copied(),
            _ => None,
        };
        if let Token::Dynamic(seg) = &mut tokens[idx] {
            seg.tail = next.unwrap_or(b'/');
        }
    }

    Ok(ParsedPattern {
        pattern: Arc::from(pattern),
        tokens,
        keys,
    })
}

fn is_marker(b: u8) -> bool {
    matches!(b, b':' | b'*' | b'{' | b'}')
}

fn segment_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'/')
        .map_or(bytes.len(), |p| from + p)
}

fn check_name(pattern: &str, name: &str) -> Result<(), RouteError> {
    if name.is_empty() {
        return Err(RouteError::invalid(pattern, "parameter name must not be empty"));
    }
    if name.bytes().any(is_marker) {
        return Err(RouteError::invalid(
            pattern,
            "only one dynamic segment is allowed per path segment",
        ));
    }
    Ok(())
}

// Index of the `}` closing the `{` at `open`; regex bodies may nest braces.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_braced<'a>(pattern: &str, body: &'a str) -> Result<(SegmentKind, &'a str), RouteError> {
    if let Some(name) = body.strip_prefix('*') {
        check_name(pattern, name)?;
        if name.contains('/') {
            return Err(RouteError::invalid(pattern, "parameter name must not contain '/'"));
        }
        return Ok((SegmentKind::CatchAll, name));
    }

    let (name, expr) = match body.find(':') {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    check_name(pattern, name)?;
    if name.contains('/') {
        return Err(RouteError::invalid(pattern, "parameter name must not contain '/'"));
    }

    match expr {
        None | Some("") => Ok((SegmentKind::Param, name)),
        Some(expr) => {
            let regex = Regex::new(&format!("^(?:{expr})$")).map_err(|source| {
                RouteError::RegexCompileError {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                    source,
                }
            })?;
            Ok((
                SegmentKind::Regex {
                    regex,
                    source: expr.into(),
                },
                name,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(p: &ParsedPattern) -> Vec<String> {
        p.tokens
            .iter()
            .map(|t| match t {
                Token::Literal(s) => format!("L({s})"),
                Token::Dynamic(seg) => format!("D({}|{})", seg.raw, seg.tail as char),
            })
            .collect()
    }

    #[test]
    fn test_static_pattern() {
        let p = parse("/users/admin").unwrap();
        assert!(p.is_static());
        assert_eq!(p.literal().as_deref(), Some("/users/admin"));
    }

    #[test]
    fn test_colon_and_brace_params() {
        let p = parse("/users/:id/posts/{post_id}").unwrap();
        assert_eq!(
            shape(&p),
            vec!["L(/users/)", "D(:id|/)", "L(/posts/)", "D({post_id}|/)"]
        );
        let keys: Vec<_> = p.keys.iter().map(|k| k.as_ref()).collect();
        assert_eq!(keys, vec!["id", "post_id"]);
    }

    #[test]
    fn test_tail_is_next_literal_byte() {
        let p = parse("/files/{name}.json").unwrap();
        assert_eq!(shape(&p), vec!["L(/files/)", "D({name}|.)", "L(.json)"]);
    }

    #[test]
    fn test_regex_segment_is_anchored() {
        let p = parse("/items/{id:[0-9]+}").unwrap();
        match &p.tokens[1] {
            Token::Dynamic(Segment {
                kind: SegmentKind::Regex { regex, source },
                ..
            }) => {
                assert_eq!(source.as_ref(), "[0-9]+");
                assert!(regex.is_match("42"));
                assert!(!regex.is_match("a42"));
                assert!(!regex.is_match("42a"));
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_regex_with_nested_braces() {
        let p = parse("/d/{year:[0-9]{4}}/x").unwrap();
        assert_eq!(shape(&p), vec!["L(/d/)", "D({year:[0-9]{4}}|/)", "L(/x)"]);
    }

    #[test]
    fn test_catch_all_forms() {
        let p = parse("/files/*path").unwrap();
        assert_eq!(p.keys[0].as_ref(), "path");
        let p = parse("/files/{*path}").unwrap();
        assert_eq!(p.keys[0].as_ref(), "path");
        let p = parse("/files/*").unwrap();
        assert_eq!(p.keys[0].as_ref(), CATCH_ALL_KEY);
    }

    #[test]
    fn test_catch_all_must_be_last() {
        for bad in ["/a/*x/b", "/a/{*x}/b", "/a/*/b"] {
            let err = parse(bad).unwrap_err();
            assert!(matches!(err, RouteError::InvalidPattern { .. }), "{bad}");
        }
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in [
            "users",
            "/a/{id",
            "/a/id}",
            "/a/:",
            "/a/{}",
            "/a/{:[0-9]+}",
            "/a/:x:y",
            "/a/{x}{y}",
            "/a/:id/:id",
        ] {
            let err = parse(bad).unwrap_err();
            assert!(matches!(err, RouteError::InvalidPattern { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn test_regex_compile_error() {
        let err = parse("/a/{id:[0-9}").unwrap_err();
        assert!(matches!(err, RouteError::RegexCompileError { .. }), "{err}");
    }

    #[test]
    fn test_escaped_markers_are_literal() {
        let p = parse(r"/a\:b/\*").unwrap();
        assert!(p.is_static());
        assert_eq!(p.literal().as_deref(), Some("/a:b/*"));
    }

    #[test]
    fn test_prefix_literal_in_segment() {
        let p = parse("/user_:name").unwrap();
        assert_eq!(shape(&p), vec!["L(/user_)", "D(:name|/)"]);
    }
}
