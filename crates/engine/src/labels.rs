//! Label expressions.
//!
//! A label expression is a boolean formula over tag literals:
//!
//! ```text
//! expr    := term (("||" | ",") term)*
//! term    := factor ("&&" factor)*
//! factor  := "!" factor | "(" expr ")" | literal
//! ```
//!
//! Two literals are reserved: `none` is always false and `all` is true for
//! any check carrying one of the tier tags.

use certsuite_core::TIER_TAGS;

/// Literal that never matches.
pub const LABEL_NONE: &str = "none";
/// Literal that matches every tiered check.
pub const LABEL_ALL: &str = "all";

/// Label expression parse error. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    /// Nothing to parse
    #[error("empty label expression")]
    Empty,

    /// Unexpected token
    #[error("unexpected {found:?} at offset {offset} in label expression")]
    Unexpected {
        /// Offending text
        found: String,
        /// Byte offset
        offset: usize,
    },

    /// Input ended early
    #[error("label expression ends early at offset {offset}, expected {expected}")]
    UnexpectedEnd {
        /// Byte offset of the end
        offset: usize,
        /// What was expected
        expected: &'static str,
    },

    /// Single `&` or `|`
    #[error("invalid operator {op:?} at offset {offset}, use \"{op}{op}\"")]
    InvalidOperator {
        /// Operator character
        op: char,
        /// Byte offset
        offset: usize,
    },
}

/// Parsed label expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelExpr {
    /// Tag literal
    Tag(String),
    /// `all`
    All,
    /// `none`
    None,
    /// Negation
    Not(Box<LabelExpr>),
    /// Conjunction
    And(Box<LabelExpr>, Box<LabelExpr>),
    /// Disjunction
    Or(Box<LabelExpr>, Box<LabelExpr>),
}

impl LabelExpr {
    /// Parse an expression.
    pub fn parse(input: &str) -> Result<Self, LabelError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: input.len(),
        };
        let expr = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(LabelError::Unexpected {
                found: token.kind.text(),
                offset: token.offset,
            });
        }
        Ok(expr)
    }

    /// Evaluate against a check's tags.
    pub fn eval<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        match self {
            LabelExpr::Tag(tag) => tags.iter().any(|t| t.as_ref() == tag),
            LabelExpr::All => tags.iter().any(|t| TIER_TAGS.contains(&t.as_ref())),
            LabelExpr::None => false,
            LabelExpr::Not(inner) => !inner.eval(tags),
            LabelExpr::And(a, b) => a.eval(tags) && b.eval(tags),
            LabelExpr::Or(a, b) => a.eval(tags) || b.eval(tags),
        }
    }
}

/// Parse `expression` and evaluate it once.
pub fn select<S: AsRef<str>>(expression: &str, tags: &[S]) -> Result<bool, LabelError> {
    Ok(LabelExpr::parse(expression)?.eval(tags))
}

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    source: String,
    expr: LabelExpr,
}

impl LabelFilter {
    /// Parse a filter.
    pub fn parse(source: &str) -> Result<Self, LabelError> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: LabelExpr::parse(source)?,
        })
    }

    /// The filter that selects nothing.
    pub fn none() -> Self {
        Self {
            source: LABEL_NONE.to_string(),
            expr: LabelExpr::None,
        }
    }

    /// Whether a check with these tags is selected.
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        self.expr.eval(tags)
    }

    /// Source text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed expression.
    pub fn expr(&self) -> &LabelExpr {
        &self.expr
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Literal(String),
}

impl TokenKind {
    fn text(&self) -> String {
        match self {
            TokenKind::And => "&&".to_string(),
            TokenKind::Or => "||".to_string(),
            TokenKind::Not => "!".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Literal(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/')
}

fn tokenize(input: &str) -> Result<Vec<Token>, LabelError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '!' => TokenKind::Not,
            ',' => TokenKind::Or,
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(LabelError::InvalidOperator { op: c, offset });
                }
                if c == '&' {
                    TokenKind::And
                } else {
                    TokenKind::Or
                }
            }
            c if is_literal_char(c) => {
                let mut end = offset + c.len_utf8();
                while let Some((i, next)) = chars.next_if(|&(_, next)| is_literal_char(next)) {
                    end = i + next.len_utf8();
                }
                TokenKind::Literal(input[offset..end].to_string())
            }
            other => {
                return Err(LabelError::Unexpected {
                    found: other.to_string(),
                    offset,
                })
            }
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<LabelExpr, LabelError> {
        let mut left = self.term()?;
        while self.eat(&TokenKind::Or) {
            let right = self.term()?;
            left = LabelExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<LabelExpr, LabelError> {
        let mut left = self.factor()?;
        while self.eat(&TokenKind::And) {
            let right = self.factor()?;
            left = LabelExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<LabelExpr, LabelError> {
        let Some(token) = self.peek().cloned() else {
            return Err(LabelError::UnexpectedEnd {
                offset: self.end,
                expected: "a label",
            });
        };
        self.pos += 1;

        match token.kind {
            TokenKind::Not => Ok(LabelExpr::Not(Box::new(self.factor()?))),
            TokenKind::LParen => {
                let inner = self.expr()?;
                if self.eat(&TokenKind::RParen) {
                    return Ok(inner);
                }
                match self.peek() {
                    Some(t) => Err(LabelError::Unexpected {
                        found: t.kind.text(),
                        offset: t.offset,
                    }),
                    None => Err(LabelError::UnexpectedEnd {
                        offset: self.end,
                        expected: "')'",
                    }),
                }
            }
            TokenKind::Literal(name) => Ok(match name.as_str() {
                LABEL_NONE => LabelExpr::None,
                LABEL_ALL => LabelExpr::All,
                _ => LabelExpr::Tag(name),
            }),
            other => Err(LabelError::Unexpected {
                found: other.text(),
                offset: token.offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: [&str; 3] = ["common", "networking", "networking-icmpv4-connectivity"];
    const OBS: [&str; 3] = ["extended", "observability", "observability-crd-status"];

    #[test]
    fn test_single_tag() {
        assert!(select("networking", &NET).unwrap());
        assert!(!select("networking", &OBS).unwrap());
    }

    #[test]
    fn test_none_never_matches() {
        let untagged: [&str; 0] = [];
        for tags in [&NET[..], &OBS[..], &untagged[..]] {
            assert!(!select("none", tags).unwrap());
        }
        assert!(select("none || observability-crd-status", &OBS).unwrap());
    }

    #[test]
    fn test_all_matches_tiered_checks() {
        assert!(select("all", &NET).unwrap());
        assert!(select("all", &OBS).unwrap());
        assert!(!select("all", &["networking"]).unwrap());
    }

    #[test]
    fn test_operators_and_precedence() {
        assert!(select("common && networking", &NET).unwrap());
        assert!(!select("common && !networking", &NET).unwrap());
        // && binds tighter than ||
        assert!(select("observability || common && networking", &NET).unwrap());
        assert!(!select("(observability || common) && extended", &NET).unwrap());
    }

    #[test]
    fn test_comma_is_or() {
        assert!(select("observability,networking", &NET).unwrap());
        assert_eq!(
            LabelExpr::parse("a, b").unwrap(),
            LabelExpr::parse("a || b").unwrap()
        );
    }

    #[test]
    fn test_eval_is_deterministic() {
        let expr = LabelExpr::parse("!(extended) && (common || telco)").unwrap();
        let first = expr.eval(&NET);
        for _ in 0..10 {
            assert_eq!(expr.eval(&NET), first);
        }
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        assert_eq!(LabelExpr::parse("   "), Err(LabelError::Empty));
        assert_eq!(
            LabelExpr::parse("common & telco"),
            Err(LabelError::InvalidOperator { op: '&', offset: 7 })
        );
        assert_eq!(
            LabelExpr::parse("common ||"),
            Err(LabelError::UnexpectedEnd { offset: 9, expected: "a label" })
        );
        assert_eq!(
            LabelExpr::parse("(common"),
            Err(LabelError::UnexpectedEnd { offset: 7, expected: "')'" })
        );
        assert!(matches!(
            LabelExpr::parse("common telco"),
            Err(LabelError::Unexpected { offset: 7, .. })
        ));
        assert!(matches!(
            LabelExpr::parse("common @"),
            Err(LabelError::Unexpected { offset: 7, .. })
        ));
    }

    #[test]
    fn test_filter_keeps_source() {
        let filter = LabelFilter::parse(" common || telco ").unwrap();
        assert_eq!(filter.as_str(), "common || telco");
        assert!(filter.matches(&NET));
        assert!(!LabelFilter::default().matches(&NET));
    }
}
