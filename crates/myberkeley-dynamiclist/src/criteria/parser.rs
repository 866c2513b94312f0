//! Tokenizer and recursive-descent parser for criteria expressions.
//!
//! Paths are checked against the access context as soon as they are read,
//! so parsing stops at the first disallowed path.

use super::CriteriaNode;
use crate::context::AccessContext;
use crate::error::AccessControlViolation;

/// Deepest group nesting accepted.
const MAX_DEPTH: usize = 64;

const FILTER_KEY: &str = "FILTER";

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
    QuotedString(String),
    Word(String),
    Eof,
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    /// Next token and the byte offset it starts at.
    fn next_token(&mut self) -> Result<(Token, usize), AccessControlViolation> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(ch) = self.peek_char() else {
            return Ok((Token::Eof, start));
        };

        let punct = match ch {
            '{' => Some(Token::OpenBrace),
            '}' => Some(Token::CloseBrace),
            '[' => Some(Token::OpenBracket),
            ']' => Some(Token::CloseBracket),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok((token, start));
        }

        if ch == '"' || ch == '\'' {
            self.pos += 1;
            return self
                .quoted_string(ch, start)
                .map(|s| (Token::QuotedString(s), start));
        }

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || "{}[]:,\"'".contains(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok((Token::Word(self.input[start..self.pos].to_string()), start))
    }

    fn quoted_string(&mut self, quote: char, start: usize) -> Result<String, AccessControlViolation> {
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                return Err(AccessControlViolation::malformed(
                    "Unterminated quoted string",
                    start,
                ));
            };
            self.pos += c.len_utf8();

            if c == quote {
                return Ok(value);
            }
            if c != '\\' {
                value.push(c);
                continue;
            }

            let escape_at = self.pos - 1;
            let Some(esc) = self.peek_char() else {
                return Err(AccessControlViolation::malformed(
                    "Unterminated quoted string",
                    start,
                ));
            };
            self.pos += esc.len_utf8();
            match esc {
                '"' | '\'' | '\\' | '/' => value.push(esc),
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                'b' => value.push('\u{8}'),
                'f' => value.push('\u{c}'),
                'u' => value.push(self.unicode_escape(escape_at)?),
                other => {
                    return Err(AccessControlViolation::malformed(
                        format!("Invalid escape '\\{other}'"),
                        escape_at,
                    ));
                }
            }
        }
    }

    fn unicode_escape(&mut self, escape_at: usize) -> Result<char, AccessControlViolation> {
        let invalid = || AccessControlViolation::malformed("Invalid unicode escape", escape_at);
        let digits = self.input.get(self.pos..self.pos + 4).ok_or_else(invalid)?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        self.pos += 4;
        char::from_u32(code).ok_or_else(invalid)
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Which allow-list a leaf is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Criteria,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "AND" | "ALL" => Some(Self::And),
            "OR" | "ANY" => Some(Self::Or),
            _ => None,
        }
    }

    fn node(self, children: Vec<CriteriaNode>) -> CriteriaNode {
        match self {
            Self::And => CriteriaNode::Conjunction(children),
            Self::Or => CriteriaNode::Disjunction(children),
        }
    }
}

struct Parser<'a> {
    context: &'a AccessContext,
    tokenizer: Tokenizer<'a>,
    current: Token,
    current_pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(context: &'a AccessContext, input: &'a str) -> Result<Self, AccessControlViolation> {
        let mut tokenizer = Tokenizer::new(input);
        let (current, current_pos) = tokenizer.next_token()?;
        Ok(Self {
            context,
            tokenizer,
            current,
            current_pos,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), AccessControlViolation> {
        (self.current, self.current_pos) = self.tokenizer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> AccessControlViolation {
        AccessControlViolation::malformed(message, self.current_pos)
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<(), AccessControlViolation> {
        if self.current != token {
            return Err(self.error(message));
        }
        self.advance()
    }

    /// Parse a leaf or a group.
    fn parse_expr(&mut self, position: Position) -> Result<CriteriaNode, AccessControlViolation> {
        match &self.current {
            Token::QuotedString(path) => {
                let path = path.clone();
                let node = check_path(self.context, path, position)?;
                self.advance()?;
                Ok(node)
            }
            Token::OpenBrace => self.parse_group(position),
            _ => Err(self.error("Expected a quoted path or a clause")),
        }
    }

    /// Parse `{COMBINATOR: operand [, FILTER: filter]}`.
    fn parse_group(&mut self, position: Position) -> Result<CriteriaNode, AccessControlViolation> {
        let group_pos = self.current_pos;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Criteria nested too deeply"));
        }
        self.advance()?;

        if self.current == Token::CloseBrace {
            return Err(self.error("Each clause must have one connector"));
        }

        let mut criteria: Option<CriteriaNode> = None;
        let mut filter: Option<CriteriaNode> = None;

        loop {
            let key_pos = self.current_pos;
            let key = match &self.current {
                Token::Word(w) | Token::QuotedString(w) => w.clone(),
                _ => return Err(self.error("Expected a connector or FILTER key")),
            };
            self.advance()?;
            self.expect(Token::Colon, "Expected ':' after key")?;

            if key == FILTER_KEY {
                if position == Position::Filter {
                    return Err(AccessControlViolation::NestedFilter { position: key_pos });
                }
                if filter.is_some() {
                    return Err(AccessControlViolation::malformed(
                        "Duplicate FILTER key",
                        key_pos,
                    ));
                }
                filter = Some(self.parse_expr(Position::Filter)?);
            } else if let Some(combinator) = Combinator::from_key(&key) {
                if criteria.is_some() {
                    return Err(AccessControlViolation::malformed(
                        "Each clause must have only one connector",
                        key_pos,
                    ));
                }
                let children = self.parse_operand(position)?;
                criteria = Some(combinator.node(children));
            } else {
                return Err(AccessControlViolation::malformed(
                    format!("Unknown query connector '{key}'"),
                    key_pos,
                ));
            }

            match self.current {
                Token::Comma => self.advance()?,
                Token::CloseBrace => {
                    self.advance()?;
                    break;
                }
                _ => return Err(self.error("Expected ',' or '}'")),
            }
        }

        self.depth -= 1;

        let Some(criteria) = criteria else {
            return Err(AccessControlViolation::StandaloneFilter {
                position: group_pos,
            });
        };

        Ok(match filter {
            Some(filter) => CriteriaNode::Gated {
                inner: Box::new(criteria),
                filter: Box::new(filter),
            },
            None => criteria,
        })
    }

    /// Parse a combinator's operand: a single expression or a bracketed list.
    fn parse_operand(
        &mut self,
        position: Position,
    ) -> Result<Vec<CriteriaNode>, AccessControlViolation> {
        if self.current != Token::OpenBracket {
            return Ok(vec![self.parse_expr(position)?]);
        }
        self.advance()?;

        if self.current == Token::CloseBracket {
            return Err(self.error("Empty operand list"));
        }

        let mut children = Vec::new();
        loop {
            children.push(self.parse_expr(position)?);
            match self.current {
                Token::Comma => self.advance()?,
                Token::CloseBracket => {
                    self.advance()?;
                    return Ok(children);
                }
                _ => return Err(self.error("Expected ',' or ']'")),
            }
        }
    }
}

/// Check a leaf path against the allow-list for its position.
fn check_path(
    context: &AccessContext,
    path: String,
    position: Position,
) -> Result<CriteriaNode, AccessControlViolation> {
    let allowed = match position {
        Position::Criteria => context.is_clause_allowed(&path),
        Position::Filter => context.is_filter_allowed(&path),
    };

    if !allowed {
        tracing::warn!(
            context_id = %context.context_id(),
            path = %path,
            ?position,
            "Dynamic list path not allowed"
        );
        let context_id = context.context_id().to_string();
        return Err(match position {
            Position::Criteria => AccessControlViolation::CriterionNotAllowed { context_id, path },
            Position::Filter => AccessControlViolation::FilterNotAllowed { context_id, path },
        });
    }

    tracing::debug!(path = %path, ?position, "Accepted dynamic list path");
    Ok(CriteriaNode::Leaf(path))
}

/// Parse a complete criteria string.
pub(super) fn parse(
    context: &AccessContext,
    input: &str,
) -> Result<CriteriaNode, AccessControlViolation> {
    let trimmed = input.trim();

    match trimmed.chars().next() {
        None => Err(AccessControlViolation::Empty),
        Some('{' | '"' | '\'') => {
            let mut parser = Parser::new(context, input)?;
            let node = parser.parse_expr(Position::Criteria)?;
            if parser.current != Token::Eof {
                return Err(parser.error("Unexpected input after criteria"));
            }
            Ok(node)
        }
        Some('[') => Err(AccessControlViolation::malformed(
            "No connector specified for operand list",
            input.len() - input.trim_start().len(),
        )),
        Some(_) => check_path(context, trimmed.to_string(), Position::Criteria),
    }
}

// =============================================================================
// Tests
// =============================================================================
