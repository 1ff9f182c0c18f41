//! Query tokenization and the operator-precedence expression tree.
//!
//! The operator table is data-driven: adding an operator means adding a row,
//! not code. Precedence climbing over the table turns the token stream into
//! an [`Expression`] tree that the typed query parsers then consume.

use crate::errors::{AxialError, AxialResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Characters that terminate a bare token.
const OPERATOR_CHARS: &str = "@,%>&|^!=<>~.()'";

fn is_safe_char(c: char) -> bool {
    !c.is_whitespace() && c != '\\' && !OPERATOR_CHARS.contains(c)
}

/// Escapes a name so it can appear as one bare token in a query.
///
/// Unsafe characters (whitespace, operators, quotes, backslash) become
/// `\xNN` byte escapes. Safe strings pass through unchanged, which makes the
/// function idempotent over them.
pub fn escape_query(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_safe_char(c) {
            out.push(c);
        } else {
            let mut bytes = [0u8; 4];
            for byte in c.encode_utf8(&mut bytes).as_bytes() {
                out.push_str(&format!("\\x{:02X}", byte));
            }
        }
    }
    out
}

/// Reverses [`escape_query`].
pub fn unescape_query(text: &str) -> AxialResult<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut bytes = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            let (byte, next) = unescape_byte(&chars, i)?;
            bytes.push(byte);
            i = next;
        } else {
            let mut buffer = [0u8; 4];
            bytes.extend_from_slice(chars[i].encode_utf8(&mut buffer).as_bytes());
            i += 1;
        }
    }
    String::from_utf8(bytes)
        .map_err(|_| AxialError::parse_error("escaped bytes are not valid UTF-8"))
}

fn unescape_byte(chars: &[char], at: usize) -> AxialResult<(u8, usize)> {
    let digits = (
        chars.get(at + 1).copied(),
        chars.get(at + 2).and_then(|c| c.to_digit(16)),
        chars.get(at + 3).and_then(|c| c.to_digit(16)),
    );
    match digits {
        (Some('x'), Some(high), Some(low)) => Ok(((high * 16 + low) as u8, at + 4)),
        _ => Err(AxialError::parse_error(format!(
            "invalid escape at position {}",
            at
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

/// One row of the operator table.
#[derive(Debug, PartialEq, Eq)]
pub struct OperatorInfo {
    pub symbol: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub arity: Arity,
}

/// The operator table, loosest binding first.
pub static OPERATORS: [OperatorInfo; 16] = [
    OperatorInfo { symbol: "%>", precedence: 1, associativity: Associativity::Left, arity: Arity::Binary },
    OperatorInfo { symbol: "@", precedence: 2, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: ",", precedence: 3, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "&", precedence: 4, associativity: Associativity::Left, arity: Arity::Binary },
    OperatorInfo { symbol: "|", precedence: 4, associativity: Associativity::Left, arity: Arity::Binary },
    OperatorInfo { symbol: "^", precedence: 4, associativity: Associativity::Left, arity: Arity::Binary },
    OperatorInfo { symbol: "=", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "!=", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "<", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "<=", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: ">", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: ">=", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "~", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "!~", precedence: 5, associativity: Associativity::None, arity: Arity::Binary },
    OperatorInfo { symbol: "!", precedence: 6, associativity: Associativity::None, arity: Arity::Unary },
    OperatorInfo { symbol: ".", precedence: 7, associativity: Associativity::Left, arity: Arity::Binary },
];

static OPERATOR_TABLE: Lazy<HashMap<&'static str, &'static OperatorInfo>> = Lazy::new(|| {
    OPERATORS
        .iter()
        .map(|info| (info.symbol, info))
        .collect()
});

pub fn operator_info(symbol: &str) -> Option<&'static OperatorInfo> {
    OPERATOR_TABLE.get(symbol).copied()
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bare or quoted name, unescaped.
    Name(String),
    /// An operation mention with its raw parameter pairs.
    Call {
        name: String,
        params: Vec<(String, String)>,
    },
    Operator(&'static OperatorInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset in the query text.
    pub position: usize,
}

/// Splits a query into tokens, unescaping names and capturing operation
/// parameter lists.
pub fn tokenize(text: &str) -> AxialResult<Vec<Token>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (position, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '\'' || c == '\\' || is_safe_char(c) {
            let (name, after_name) = lex_name(&chars, i)?;
            let mut next = after_name;
            while next < chars.len() && chars[next].1.is_whitespace() {
                next += 1;
            }
            if next < chars.len() && chars[next].1 == '(' {
                let (params, after_params) = lex_params(&chars, next)?;
                tokens.push(Token {
                    kind: TokenKind::Call { name, params },
                    position,
                });
                i = after_params;
            } else {
                tokens.push(Token {
                    kind: TokenKind::Name(name),
                    position,
                });
                i = after_name;
            }
            continue;
        }
        let (symbol, width) = lex_operator(&chars, i).ok_or_else(|| {
            AxialError::parse_error(format!(
                "unexpected character: {} at position {}",
                c, position
            ))
        })?;
        let info = operator_info(symbol)
            .unwrap_or_else(|| unreachable!("the lexer only emits table operators"));
        tokens.push(Token {
            kind: TokenKind::Operator(info),
            position,
        });
        i += width;
    }
    Ok(tokens)
}

fn lex_operator(chars: &[(usize, char)], at: usize) -> Option<(&'static str, usize)> {
    let first = chars[at].1;
    let second = chars.get(at + 1).map(|(_, c)| *c);
    let two = match (first, second) {
        ('%', Some('>')) => Some("%>"),
        ('!', Some('=')) => Some("!="),
        ('!', Some('~')) => Some("!~"),
        ('<', Some('=')) => Some("<="),
        ('>', Some('=')) => Some(">="),
        _ => None,
    };
    if let Some(symbol) = two {
        return Some((symbol, 2));
    }
    let one = match first {
        '@' => "@",
        ',' => ",",
        '&' => "&",
        '|' => "|",
        '^' => "^",
        '=' => "=",
        '<' => "<",
        '>' => ">",
        '~' => "~",
        '!' => "!",
        '.' => ".",
        _ => return None,
    };
    Some((one, 1))
}

fn lex_name(chars: &[(usize, char)], at: usize) -> AxialResult<(String, usize)> {
    if at >= chars.len() {
        return Err(AxialError::parse_error("unexpected end of query"));
    }
    let mut bytes = Vec::new();
    let mut i = at;
    if chars[i].1 == '\'' {
        i += 1;
        loop {
            let Some((_, c)) = chars.get(i).copied() else {
                return Err(AxialError::parse_error(format!(
                    "unterminated quoted name at position {}",
                    chars[at].0
                )));
            };
            if c == '\'' {
                i += 1;
                break;
            }
            i = push_char(&mut bytes, chars, i)?;
        }
    } else {
        while i < chars.len() {
            let c = chars[i].1;
            if c != '\\' && !is_safe_char(c) {
                break;
            }
            i = push_char(&mut bytes, chars, i)?;
        }
    }
    String::from_utf8(bytes).map(|name| (name, i)).map_err(|_| {
        AxialError::parse_error(format!(
            "escaped bytes are not valid UTF-8 at position {}",
            chars[at].0
        ))
    })
}

fn push_char(bytes: &mut Vec<u8>, chars: &[(usize, char)], at: usize) -> AxialResult<usize> {
    let c = chars[at].1;
    if c == '\\' {
        let plain: Vec<char> = chars[at..].iter().map(|(_, c)| *c).collect();
        let (byte, width) = unescape_byte(&plain, 0)
            .map_err(|_| AxialError::parse_error(format!("invalid escape at position {}", chars[at].0)))?;
        bytes.push(byte);
        Ok(at + width)
    } else {
        let mut buffer = [0u8; 4];
        bytes.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
        Ok(at + 1)
    }
}

fn lex_params(
    chars: &[(usize, char)],
    at: usize,
) -> AxialResult<(Vec<(String, String)>, usize)> {
    let mut params = Vec::new();
    let mut i = at + 1;
    let skip_whitespace = |mut i: usize| {
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        i
    };
    i = skip_whitespace(i);
    if i < chars.len() && chars[i].1 == ')' {
        return Ok((params, i + 1));
    }
    loop {
        i = skip_whitespace(i);
        let (key, after_key) = lex_name(chars, i)?;
        i = skip_whitespace(after_key);
        if chars.get(i).map(|(_, c)| *c) != Some('=') {
            return Err(AxialError::parse_error(format!(
                "expected = after the parameter: {} at position {}",
                key,
                chars.get(i).map(|(p, _)| *p).unwrap_or(0)
            )));
        }
        i = skip_whitespace(i + 1);
        let (value, after_value) = lex_name(chars, i)?;
        params.push((key, value));
        i = skip_whitespace(after_value);
        match chars.get(i).map(|(_, c)| *c) {
            Some(',') => {
                i += 1;
            }
            Some(')') => {
                return Ok((params, i + 1));
            }
            _ => {
                return Err(AxialError::parse_error(format!(
                    "expected , or ) in a parameter list at position {}",
                    chars.get(i).map(|(p, _)| *p).unwrap_or(0)
                )));
            }
        }
    }
}

/// An operator-precedence expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Leaf(Token),
    Unary {
        operator: &'static OperatorInfo,
        operand: Box<Expression>,
        position: usize,
    },
    Binary {
        operator: &'static OperatorInfo,
        left: Box<Expression>,
        right: Box<Expression>,
        position: usize,
    },
}

/// Parses a query into an expression tree by precedence climbing.
pub fn parse_expression(text: &str) -> AxialResult<Expression> {
    let tokens = tokenize(text)?;
    let mut cursor = 0;
    let expression = climb(&tokens, &mut cursor, 0)?;
    if let Some(extra) = tokens.get(cursor) {
        return Err(AxialError::parse_error(format!(
            "unexpected trailing input at position {}",
            extra.position
        )));
    }
    Ok(expression)
}

fn climb(tokens: &[Token], cursor: &mut usize, min_precedence: u8) -> AxialResult<Expression> {
    let mut left = parse_atom(tokens, cursor)?;
    loop {
        let Some(token) = tokens.get(*cursor) else {
            break;
        };
        let TokenKind::Operator(info) = &token.kind else {
            break;
        };
        if info.arity == Arity::Unary {
            return Err(AxialError::parse_error(format!(
                "operator {} cannot appear between operands at position {}",
                info.symbol, token.position
            )));
        }
        if info.precedence < min_precedence {
            break;
        }
        *cursor += 1;
        let next_min = match info.associativity {
            Associativity::Right => info.precedence,
            Associativity::Left | Associativity::None => info.precedence + 1,
        };
        let right = climb(tokens, cursor, next_min)?;
        if info.associativity == Associativity::None {
            if let Some(next) = tokens.get(*cursor) {
                if let TokenKind::Operator(next_info) = &next.kind {
                    if next_info.precedence == info.precedence && next_info.arity == Arity::Binary {
                        return Err(AxialError::parse_error(format!(
                            "operator {} is not associative at position {}",
                            next_info.symbol, next.position
                        )));
                    }
                }
            }
        }
        left = Expression::Binary {
            operator: *info,
            left: Box::new(left),
            right: Box::new(right),
            position: token.position,
        };
    }
    Ok(left)
}

fn parse_atom(tokens: &[Token], cursor: &mut usize) -> AxialResult<Expression> {
    let Some(token) = tokens.get(*cursor) else {
        return Err(AxialError::parse_error("unexpected end of query"));
    };
    match &token.kind {
        TokenKind::Name(_) | TokenKind::Call { .. } => {
            *cursor += 1;
            Ok(Expression::Leaf(token.clone()))
        }
        TokenKind::Operator(info) if info.arity == Arity::Unary => {
            let position = token.position;
            *cursor += 1;
            let operand = climb(tokens, cursor, info.precedence)?;
            Ok(Expression::Unary {
                operator: *info,
                operand: Box::new(operand),
                position,
            })
        }
        TokenKind::Operator(info) => Err(AxialError::parse_error(format!(
            "unexpected operator: {} at position {}",
            info.symbol, token.position
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(expression: &Expression) -> &str {
        match expression {
            Expression::Leaf(Token {
                kind: TokenKind::Name(name),
                ..
            }) => name,
            other => panic!("expected a name, got {:?}", other),
        }
    }

    #[test]
    fn test_escape_round_trip() {
        let tricky = "T cell (naive)";
        let escaped = escape_query(tricky);
        assert!(!escaped.contains(' '));
        assert_eq!(unescape_query(&escaped).unwrap(), tricky);
        assert_eq!(escape_query("safe-name"), "safe-name");
        assert_eq!(escape_query(&escape_query("safe-name")), "safe-name");
    }

    #[test]
    fn test_tokenize_operators_longest_match() {
        let tokens = tokenize("a != b").unwrap();
        assert_eq!(tokens.len(), 3);
        match &tokens[1].kind {
            TokenKind::Operator(info) => assert_eq!(info.symbol, "!="),
            other => panic!("expected operator, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_call_params() {
        let tokens = tokenize("Sum(axis = Columns)").unwrap();
        assert_eq!(tokens.len(), 1);
        match &tokens[0].kind {
            TokenKind::Call { name, params } => {
                assert_eq!(name, "Sum");
                assert_eq!(params, &[("axis".to_string(), "Columns".to_string())]);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_shapes() {
        // Comparison binds tighter than lookup: cell @ (age > 15).
        let expression = parse_expression("cell @ age > 15").unwrap();
        let Expression::Binary { operator, left, right, .. } = &expression else {
            panic!("expected a binary root");
        };
        assert_eq!(operator.symbol, "@");
        assert_eq!(name(left), "cell");
        let Expression::Binary { operator, .. } = right.as_ref() else {
            panic!("expected a comparison under @");
        };
        assert_eq!(operator.symbol, ">");
    }

    #[test]
    fn test_pair_binds_tighter_than_lookup() {
        let expression = parse_expression("cell, gene @ umi").unwrap();
        let Expression::Binary { operator, left, .. } = &expression else {
            panic!("expected a binary root");
        };
        assert_eq!(operator.symbol, "@");
        let Expression::Binary { operator, .. } = left.as_ref() else {
            panic!("expected a pair under @");
        };
        assert_eq!(operator.symbol, ",");
    }

    #[test]
    fn test_non_associative_operators_reject_chains() {
        assert!(parse_expression("a @ b @ c").is_err());
        assert!(parse_expression("a < b < c").is_err());
    }

    #[test]
    fn test_quoted_names() {
        let tokens = tokenize("'T cell' @ age").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Name("T cell".to_string())
        );
    }

    #[test]
    fn test_errors_carry_positions() {
        let error = parse_expression("cell @").unwrap_err();
        assert!(error.to_string().contains("unexpected end of query"));
        let error = parse_expression("cell $ age").unwrap_err();
        assert!(error.to_string().contains("position 5"));
    }
}
