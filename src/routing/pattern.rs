//! Pattern compilation for route paths and domains.
//!
//! # Syntax
//! - `{name}`: captures exactly one segment
//! - `{...name}`: captures the remainder of a path, slashes included
//! - literal text mixed with `{name}` tokens inside one segment,
//!   e.g. `/files/{id}.{ext}` or `/npm/@{scope}/{package}`
//!
//! Domains use the same grammar with `.` as the separator and no wildcards.
//!
//! # Design Decisions
//! - Patterns are compiled once at registration; nothing is parsed per request
//! - Only mixed segments use a regex, anchored to the whole segment
//! - Captured values are returned raw (still percent-encoded)

use regex::Regex;

use crate::error::PatternError;
use crate::routing::params::Params;

/// How literal a pattern is. Higher wins when routes overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    /// Contains a `{...name}` wildcard.
    Wildcard,
    /// Contains at least one bare `{name}` segment.
    Dynamic,
    /// Only literal segments and mixed segments with literal text.
    Mixed,
    /// Fully literal.
    Literal,
}

/// What the pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Path,
    Domain,
}

impl PatternKind {
    fn separator(self) -> char {
        match self {
            PatternKind::Path => '/',
            PatternKind::Domain => '.',
        }
    }
}

/// A single compiled segment.
#[derive(Debug, Clone)]
pub enum Segment {
    Static(String),
    Dynamic(String),
    Mixed(MixedSegment),
    Wildcard(String),
}

/// Segment mixing literal text and captures, e.g. `{id}.txt`.
#[derive(Debug, Clone)]
pub struct MixedSegment {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl MixedSegment {
    pub fn source(&self) -> &str {
        &self.source
    }

    fn capture(&self, input: &str, params: &mut Params) -> bool {
        let Some(caps) = self.regex.captures(input) else {
            return false;
        };
        for name in &self.names {
            match caps.name(name) {
                Some(m) => params.push(name.clone(), m.as_str()),
                None => return false,
            }
        }
        true
    }
}

/// A compiled path or domain pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    kind: PatternKind,
    segments: Vec<Segment>,
    specificity: Specificity,
}

#[derive(Debug)]
enum Token {
    Literal(String),
    Param(String),
    Wildcard(String),
}

impl CompiledPattern {
    /// Compile a slash-delimited path pattern.
    pub fn path(pattern: &str) -> Result<Self, PatternError> {
        Self::compile(pattern, PatternKind::Path)
    }

    /// Compile a dot-delimited domain pattern.
    pub fn domain(pattern: &str) -> Result<Self, PatternError> {
        Self::compile(&pattern.to_ascii_lowercase(), PatternKind::Domain)
    }

    fn compile(pattern: &str, kind: PatternKind) -> Result<Self, PatternError> {
        if let Some(c) = pattern.chars().find(|c| matches!(c, '*' | ':')) {
            return Err(PatternError::ForbiddenToken(c));
        }

        let parts = split(pattern, kind);
        let mut segments = Vec::with_capacity(parts.len());
        let mut seen: Vec<String> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let tokens = tokenize(part)?;
            for token in &tokens {
                if let Token::Param(name) | Token::Wildcard(name) = token {
                    if seen.contains(name) {
                        return Err(PatternError::DuplicateName(name.clone()));
                    }
                    seen.push(name.clone());
                }
            }

            let segment = build_segment(part, tokens, kind)?;
            if let Segment::Wildcard(name) = &segment {
                if kind == PatternKind::Domain {
                    return Err(PatternError::WildcardInDomain);
                }
                if index + 1 != parts.len() {
                    return Err(PatternError::WildcardNotTerminal(name.clone()));
                }
            }
            segments.push(segment);
        }

        let specificity = score(&segments);
        Ok(Self {
            source: pattern.to_string(),
            kind,
            segments,
            specificity,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Names of every capture, in declaration order.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Dynamic(n) | Segment::Wildcard(n) => names.push(n.as_str()),
                Segment::Mixed(m) => names.extend(m.names.iter().map(String::as_str)),
                Segment::Static(_) => {}
            }
        }
        names
    }

    /// Match `input` and append the captured values to `params`.
    ///
    /// On failure `params` is left exactly as it was passed in.
    pub fn capture(&self, input: &str, params: &mut Params) -> bool {
        let mark = params.len();
        let matched = self.capture_inner(input, params);
        if !matched {
            params.truncate(mark);
        }
        matched
    }

    /// Match `input`, returning the captures on success.
    pub fn matches(&self, input: &str) -> Option<Params> {
        let mut params = Params::new();
        self.capture(input, &mut params).then_some(params)
    }

    fn capture_inner(&self, input: &str, params: &mut Params) -> bool {
        let lowered;
        let input = match self.kind {
            PatternKind::Domain => {
                lowered = input.to_ascii_lowercase();
                lowered.as_str()
            }
            PatternKind::Path => input,
        };
        let parts = split(input, self.kind);
        let sep = self.kind.separator().to_string();

        for (index, segment) in self.segments.iter().enumerate() {
            let ok = match (segment, parts.get(index).copied()) {
                (Segment::Wildcard(name), _) => {
                    let rest = parts.get(index..).map(|p| p.join(&sep)).unwrap_or_default();
                    if rest.is_empty() {
                        return false;
                    }
                    params.push(name.clone(), rest);
                    return true;
                }
                (_, None) => false,
                (Segment::Static(lit), Some(part)) => lit == part,
                (Segment::Dynamic(_), Some("")) => false,
                (Segment::Dynamic(name), Some(part)) => {
                    params.push(name.clone(), part);
                    true
                }
                (Segment::Mixed(mixed), Some(part)) => mixed.capture(part, params),
            };
            if !ok {
                return false;
            }
        }

        parts.len() == self.segments.len()
    }
}

/// Split on the separator, ignoring one leading and one trailing separator.
///
/// This is what makes `/posts` and `/posts/` equivalent.
fn split(input: &str, kind: PatternKind) -> Vec<&str> {
    let sep = kind.separator();
    let trimmed = input.strip_prefix(sep).unwrap_or(input);
    let trimmed = trimmed.strip_suffix(sep).unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split(sep).collect()
    }
}

fn tokenize(segment: &str) -> Result<Vec<Token>, PatternError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut placeholder: Option<String> = None;

    for c in segment.chars() {
        match (c, placeholder.as_mut()) {
            ('{', None) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                placeholder = Some(String::new());
            }
            ('{', Some(_)) | ('}', None) => {
                return Err(PatternError::UnbalancedBrace(segment.to_string()));
            }
            ('}', Some(_)) => {
                let content = placeholder.take().unwrap_or_default();
                tokens.push(classify(&content)?);
            }
            (c, Some(content)) => content.push(c),
            (c, None) => literal.push(c),
        }
    }

    if placeholder.is_some() {
        return Err(PatternError::UnbalancedBrace(segment.to_string()));
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn classify(content: &str) -> Result<Token, PatternError> {
    if let Some(name) = content.strip_prefix("...") {
        validate_name(name)?;
        return Ok(Token::Wildcard(name.to_string()));
    }
    if content.contains("...") {
        return Err(PatternError::MisplacedEllipsis(content.to_string()));
    }
    validate_name(content)?;
    Ok(Token::Param(content.to_string()))
}

fn validate_name(name: &str) -> Result<(), PatternError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PatternError::InvalidName(name.to_string()))
    }
}

fn build_segment(source: &str, tokens: Vec<Token>, kind: PatternKind) -> Result<Segment, PatternError> {
    let has_wildcard = tokens.iter().any(|t| matches!(t, Token::Wildcard(_)));
    if has_wildcard && tokens.len() > 1 {
        let name = tokens
            .into_iter()
            .find_map(|t| match t {
                Token::Wildcard(n) => Some(n),
                _ => None,
            })
            .unwrap_or_default();
        return Err(PatternError::WildcardNotAlone(name));
    }

    let mut tokens = tokens;
    if tokens.len() <= 1 {
        return Ok(match tokens.pop() {
            None => Segment::Static(String::new()),
            Some(Token::Literal(lit)) => Segment::Static(lit),
            Some(Token::Param(name)) => Segment::Dynamic(name),
            Some(Token::Wildcard(name)) => Segment::Wildcard(name),
        });
    }

    let class = match kind {
        PatternKind::Path => "[^/]+",
        PatternKind::Domain => "[^.]+",
    };
    let mut expr = String::from("^");
    let mut names = Vec::new();
    for token in tokens {
        match token {
            Token::Literal(lit) => expr.push_str(&regex::escape(&lit)),
            Token::Param(name) => {
                expr.push_str(&format!("(?P<{name}>{class})"));
                names.push(name);
            }
            Token::Wildcard(_) => {}
        }
    }
    expr.push('$');

    let regex = Regex::new(&expr).map_err(|_| PatternError::InvalidName(source.to_string()))?;
    Ok(Segment::Mixed(MixedSegment {
        source: source.to_string(),
        regex,
        names,
    }))
}

fn score(segments: &[Segment]) -> Specificity {
    let mut specificity = Specificity::Literal;
    for segment in segments {
        let s = match segment {
            Segment::Static(_) => Specificity::Literal,
            Segment::Mixed(_) => Specificity::Mixed,
            Segment::Dynamic(_) => Specificity::Dynamic,
            Segment::Wildcard(_) => Specificity::Wildcard,
        };
        specificity = specificity.min(s);
    }
    specificity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        CompiledPattern::path(pattern)
            .unwrap()
            .matches(path)
            .map(|p| p.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect())
    }

    fn pair(n: &str, v: &str) -> (String, String) {
        (n.to_string(), v.to_string())
    }

    #[test]
    fn test_static_and_dynamic_segments() {
        assert_eq!(params("/about", "/about"), Some(vec![]));
        assert_eq!(params("/about", "/contact"), None);
        assert_eq!(params("/user/{id}", "/user/123"), Some(vec![pair("id", "123")]));
        assert_eq!(params("/user/{id}", "/user"), None);
        assert_eq!(params("/user/{id}", "/user/1/extra"), None);
        assert_eq!(params("/", "/"), Some(vec![]));
    }

    #[test]
    fn test_trailing_slash_is_insignificant() {
        assert!(params("/posts/", "/posts").is_some());
        assert!(params("/posts/", "/posts/").is_some());
        assert!(params("/posts", "/posts/").is_some());
        assert!(params("/posts/{id}", "/posts/7/").is_some());
    }

    #[test]
    fn test_mixed_segments() {
        assert_eq!(
            params("/files/{id}.{ext}", "/files/report.pdf"),
            Some(vec![pair("id", "report"), pair("ext", "pdf")])
        );
        assert_eq!(params("/files/{id}.{ext}", "/files/report"), None);
        assert_eq!(
            params("/npm/@{scope}/{package}", "/npm/@types/node"),
            Some(vec![pair("scope", "types"), pair("package", "node")])
        );
        assert_eq!(
            params("/files/{category}/{id},name={name}.txt", "/files/docs/42,name=notes.txt"),
            Some(vec![pair("category", "docs"), pair("id", "42"), pair("name", "notes")])
        );
        // literal regex metacharacters are escaped
        assert_eq!(params("/files/{id}.txt", "/files/abcxtxt"), None);
    }

    #[test]
    fn test_wildcard_captures_remainder() {
        assert_eq!(
            params("/files/{...path}", "/files/a/b/c"),
            Some(vec![pair("path", "a/b/c")])
        );
        assert_eq!(params("/files/{...path}", "/files"), None);
        assert_eq!(params("/files/{...path}", "/files/x/"), Some(vec![pair("path", "x")]));
    }

    #[test]
    fn test_captures_stay_percent_encoded() {
        assert_eq!(params("/tag/{name}", "/tag/a%20b"), Some(vec![pair("name", "a%20b")]));
    }

    #[test]
    fn test_rejects_malformed_patterns() {
        let err = |p: &str| CompiledPattern::path(p).unwrap_err();
        assert_eq!(err("/files/*"), PatternError::ForbiddenToken('*'));
        assert_eq!(err("/user/:id"), PatternError::ForbiddenToken(':'));
        assert_eq!(err("/user/{id"), PatternError::UnbalancedBrace("{id".into()));
        assert_eq!(err("/user/id}"), PatternError::UnbalancedBrace("id}".into()));
        assert_eq!(err("/user/{{id}}"), PatternError::UnbalancedBrace("{{id}}".into()));
        assert_eq!(err("/files/{path...}"), PatternError::MisplacedEllipsis("path...".into()));
        assert_eq!(err("/files/{...path}/edit"), PatternError::WildcardNotTerminal("path".into()));
        assert_eq!(err("/files/x{...path}"), PatternError::WildcardNotAlone("path".into()));
        assert_eq!(err("/a/{}"), PatternError::InvalidName(String::new()));
        assert_eq!(err("/a/{1x}"), PatternError::InvalidName("1x".into()));
        assert_eq!(err("/a/{id}/{id}"), PatternError::DuplicateName("id".into()));
    }

    #[test]
    fn test_specificity_ordering() {
        let spec = |p: &str| CompiledPattern::path(p).unwrap().specificity();
        assert_eq!(spec("/posts/latest"), Specificity::Literal);
        assert_eq!(spec("/files/{id}.txt"), Specificity::Mixed);
        assert_eq!(spec("/posts/{id}"), Specificity::Dynamic);
        assert_eq!(spec("/posts/{...rest}"), Specificity::Wildcard);
        assert!(Specificity::Literal > Specificity::Mixed);
        assert!(Specificity::Mixed > Specificity::Dynamic);
        assert!(Specificity::Dynamic > Specificity::Wildcard);
    }

    #[test]
    fn test_domain_patterns() {
        let literal = CompiledPattern::domain("WWW.example.com").unwrap();
        assert_eq!(literal.specificity(), Specificity::Literal);
        assert!(literal.matches("www.EXAMPLE.com").is_some());

        let account = CompiledPattern::domain("{account}.example.com").unwrap();
        let captured = account.matches("acme.example.com").unwrap();
        assert_eq!(captured.get("account"), Some("acme"));
        assert!(account.matches("example.com").is_none());
        assert!(account.matches("a.b.example.com").is_none());

        let mixed = CompiledPattern::domain("api-{region}.example.com").unwrap();
        assert_eq!(mixed.matches("api-eu.example.com").unwrap().get("region"), Some("eu"));

        assert_eq!(
            CompiledPattern::domain("{...rest}.example.com").unwrap_err(),
            PatternError::WildcardInDomain
        );
    }

    #[test]
    fn test_failed_capture_leaves_params_untouched() {
        let pattern = CompiledPattern::path("/a/{x}/b").unwrap();
        let mut params = Params::new();
        params.push("host", "h");
        assert!(!pattern.capture("/a/1/c", &mut params));
        assert_eq!(params.len(), 1);
    }
}
