use logos::Logos;
use std::fmt;

/// Token type for expresso script fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
    /// Comma separator `,`.
    Comma,
    /// Statement separator `;`.
    Semi,
    /// Path separator `.`.
    Dot,
    /// `!`.
    Bang,
    /// `&&`.
    AndAnd,
    /// `||`.
    OrOr,
    /// `^`.
    Caret,
    /// `==`.
    EqEq,
    /// `!=`.
    NotEq,
    /// `<`.
    Lt,
    /// `>`.
    Gt,
    /// `<=`.
    LtEq,
    /// `>=`.
    GtEq,
    /// `+`.
    Plus,
    /// `-`.
    Minus,
    /// `*`.
    Star,
    /// `/`.
    Slash,
    /// `%`.
    Percent,
    /// `=`.
    Assign,
    /// `+=`.
    PlusAssign,
    /// `-=`.
    MinusAssign,
    /// `*=`.
    StarAssign,
    /// `/=`.
    SlashAssign,
    /// `%=`.
    PercentAssign,
    /// `++`.
    PlusPlus,
    /// `--`.
    MinusMinus,
    /// `true`.
    True,
    /// `false`.
    False,
    /// String literal, single or double quoted.
    Str(String),
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// Identifier.
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Dot => ".",
            Token::Bang => "!",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Caret => "^",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::PercentAssign => "%=",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::True => "true",
            Token::False => "false",
            Token::Str(s) => return write!(f, "\"{s}\""),
            Token::Integer(n) => return write!(f, "{n}"),
            Token::Float(n) => return write!(f, "{n}"),
            Token::Ident(w) => w,
        };
        f.write_str(text)
    }
}

/// Internal logos token, converted to an owned `Token` after lexing.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("^")]
    Caret,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("/*")]
    BlockCommentStart,

    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    DoubleQuoted,
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    SingleQuoted,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// A lexer error with source location.
#[derive(Debug, Clone)]
pub struct LexError {
    /// Byte range of the erroneous input in the source.
    pub span: std::ops::Range<usize>,
    /// Human-readable description of the lexer error.
    pub message: String,
}

/// Lex a script fragment into `(Token, Span)` pairs.
///
/// Lexing continues past errors so every problem in a fragment is reported.
pub fn lex(source: &str) -> (Vec<(Token, std::ops::Range<usize>)>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                errors.push(LexError {
                    span: span.clone(),
                    message: format!("unexpected character: {:?}", &source[span.clone()]),
                });
                continue;
            }
        };
        let token = match raw {
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::Comma => Token::Comma,
            RawToken::Semi => Token::Semi,
            RawToken::Dot => Token::Dot,
            RawToken::Bang => Token::Bang,
            RawToken::AndAnd => Token::AndAnd,
            RawToken::OrOr => Token::OrOr,
            RawToken::Caret => Token::Caret,
            RawToken::EqEq => Token::EqEq,
            RawToken::NotEq => Token::NotEq,
            RawToken::Lt => Token::Lt,
            RawToken::Gt => Token::Gt,
            RawToken::LtEq => Token::LtEq,
            RawToken::GtEq => Token::GtEq,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Star => Token::Star,
            RawToken::Slash => Token::Slash,
            RawToken::Percent => Token::Percent,
            RawToken::Assign => Token::Assign,
            RawToken::PlusAssign => Token::PlusAssign,
            RawToken::MinusAssign => Token::MinusAssign,
            RawToken::StarAssign => Token::StarAssign,
            RawToken::SlashAssign => Token::SlashAssign,
            RawToken::PercentAssign => Token::PercentAssign,
            RawToken::PlusPlus => Token::PlusPlus,
            RawToken::MinusMinus => Token::MinusMinus,
            RawToken::BlockCommentStart => {
                // Scan forward for the closing */
                match lexer.remainder().find("*/") {
                    Some(end_idx) => lexer.bump(end_idx + 2),
                    None => {
                        errors.push(LexError {
                            span: span.clone(),
                            message: "unterminated block comment (missing closing */)".to_string(),
                        });
                        lexer.bump(lexer.remainder().len());
                    }
                }
                continue;
            }
            RawToken::True => Token::True,
            RawToken::False => Token::False,
            RawToken::DoubleQuoted | RawToken::SingleQuoted => {
                let slice = lexer.slice();
                Token::Str(unescape(&slice[1..slice.len() - 1]))
            }
            RawToken::Float => match lexer.slice().parse::<f64>() {
                Ok(n) => Token::Float(n),
                Err(_) => {
                    errors.push(LexError {
                        span: span.clone(),
                        message: format!("invalid float literal: {}", lexer.slice()),
                    });
                    continue;
                }
            },
            RawToken::Integer => match lexer.slice().parse::<i64>() {
                Ok(n) => Token::Integer(n),
                Err(_) => {
                    errors.push(LexError {
                        span: span.clone(),
                        message: format!("invalid integer literal: {}", lexer.slice()),
                    });
                    continue;
                }
            },
            RawToken::Ident => Token::Ident(lexer.slice().to_string()),
        };
        tokens.push((token, span));
    }

    (tokens, errors)
}

/// Process escape sequences in a string literal.
///
/// Supports `\\`, `\n`, `\t`, `\"`, `\'`. Unknown sequences are kept as-is.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_strings(source: &str) -> Vec<String> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "errors: {errors:?}");
        tokens.iter().map(|(t, _)| t.to_string()).collect()
    }

    #[test]
    fn lex_condition() {
        assert_eq!(
            token_strings("GameState.awake == true && gold >= 10"),
            vec!["GameState", ".", "awake", "==", "true", "&&", "gold", ">=", "10"]
        );
    }

    #[test]
    fn lex_instruction_operators() {
        assert_eq!(
            token_strings("a += 1; b--; c = !d"),
            vec!["a", "+=", "1", ";", "b", "--", ";", "c", "=", "!", "d"]
        );
    }

    #[test]
    fn lex_literals() {
        let (tokens, errors) = lex(r#"1.5 42 "say \"hi\"" 'it' FALSE"#);
        assert!(errors.is_empty());
        let tokens: Vec<Token> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Float(1.5),
                Token::Integer(42),
                Token::Str("say \"hi\"".into()),
                Token::Str("it".into()),
                Token::False,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            token_strings("a = 1; // trailing\n/* block\n comment */ b = 2"),
            vec!["a", "=", "1", ";", "b", "=", "2"]
        );
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let (_, errors) = lex("a /* never closed");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated"));
    }

    #[test]
    fn unexpected_characters_are_reported() {
        let (tokens, errors) = lex("a # b");
        assert_eq!(tokens.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, 2..3);
    }

    #[test]
    fn spans_cover_source() {
        let (tokens, _) = lex("foo(1)");
        assert_eq!(tokens[0].1, 0..3);
        assert_eq!(tokens[2].1, 4..5);
    }
}
