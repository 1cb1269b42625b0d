use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::ast::*;
use crate::lexer::Token;

type Span = SimpleSpan;

/// Parse error with source span.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Byte range where parsing failed.
    pub span: std::ops::Range<usize>,
    /// Human-readable description of the parse failure.
    pub message: String,
}

fn to_ast_span(s: Span) -> crate::ast::Span {
    s.into_range()
}

fn spanned<T>(node: T, span: Span) -> Spanned<T> {
    Spanned {
        node,
        span: to_ast_span(span),
    }
}

fn binary(lhs: Spanned<Expr>, (op, rhs): (BinaryOp, Spanned<Expr>)) -> Spanned<Expr> {
    let span = lhs.span.start..rhs.span.end;
    Spanned::new(
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Expression parser. Precedence, loosest first:
/// `||`, `&&`, `^`, `== !=`, `< > <= >=`, `+ -`, `* / %`, prefix `! -`.
fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let literal = select! {
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Integer(n) => Literal::Int(n),
            Token::Float(n) => Literal::Float(n),
            Token::Str(s) => Literal::String(s),
        }
        .map(Expr::Literal)
        .labelled("literal");

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let path_or_call = select! { Token::Ident(name) => name }
            .labelled("identifier")
            .separated_by(just(Token::Dot))
            .at_least(1)
            .collect::<Vec<String>>()
            .then(args.or_not())
            .map(|(path, args)| match args {
                Some(args) => Expr::Call {
                    name: path.join("."),
                    args,
                },
                None => Expr::Path(path),
            });

        let atom = choice((literal, path_or_call))
            .map_with(|node, e| spanned(node, e.span()))
            .or(expr.delimited_by(just(Token::LParen), just(Token::RParen)))
            .boxed();

        let unary = select! {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
        }
        .map_with(|op, e| (op, to_ast_span(e.span())))
        .repeated()
        .foldr(atom, |(op, op_span), operand: Spanned<Expr>| {
            let span = op_span.start..operand.span.end;
            Spanned::new(
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            )
        })
        .boxed();

        let product = unary
            .clone()
            .foldl(
                select! {
                    Token::Star => BinaryOp::Mul,
                    Token::Slash => BinaryOp::Div,
                    Token::Percent => BinaryOp::Rem,
                }
                .then(unary)
                .repeated(),
                binary,
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                select! {
                    Token::Plus => BinaryOp::Add,
                    Token::Minus => BinaryOp::Sub,
                }
                .then(product)
                .repeated(),
                binary,
            )
            .boxed();

        let comparison = sum
            .clone()
            .foldl(
                select! {
                    Token::Lt => BinaryOp::Lt,
                    Token::Gt => BinaryOp::Gt,
                    Token::LtEq => BinaryOp::Le,
                    Token::GtEq => BinaryOp::Ge,
                }
                .then(sum)
                .repeated(),
                binary,
            )
            .boxed();

        let equality = comparison
            .clone()
            .foldl(
                select! {
                    Token::EqEq => BinaryOp::Eq,
                    Token::NotEq => BinaryOp::Ne,
                }
                .then(comparison)
                .repeated(),
                binary,
            )
            .boxed();

        let xor = equality
            .clone()
            .foldl(
                just(Token::Caret).to(BinaryOp::Xor).then(equality).repeated(),
                binary,
            )
            .boxed();

        let and = xor
            .clone()
            .foldl(
                just(Token::AndAnd).to(BinaryOp::And).then(xor).repeated(),
                binary,
            )
            .boxed();

        and.clone()
            .foldl(
                just(Token::OrOr).to(BinaryOp::Or).then(and).repeated(),
                binary,
            )
            .labelled("expression")
    })
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn instruction_parser<'a, I>()
-> impl Parser<'a, I, Vec<Spanned<Stmt>>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    let expr = expr_parser();

    let target = select! { Token::Ident(name) => name }
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<String>>()
        .map_with(|path, e| spanned(path, e.span()));

    let assign_op = select! {
        Token::Assign => AssignOp::Set,
        Token::PlusAssign => AssignOp::Add,
        Token::MinusAssign => AssignOp::Sub,
        Token::StarAssign => AssignOp::Mul,
        Token::SlashAssign => AssignOp::Div,
        Token::PercentAssign => AssignOp::Rem,
    };

    let assign = target
        .clone()
        .then(assign_op)
        .then(expr.clone())
        .map(|((target, op), value)| Stmt::Assign { target, op, value });

    let step = target
        .then(select! {
            Token::PlusPlus => 1i64,
            Token::MinusMinus => -1i64,
        })
        .map(|(target, delta)| Stmt::Step { target, delta });

    let statement = choice((assign, step, expr.map(Stmt::Expr)))
        .map_with(|stmt, e| spanned(stmt, e.span()))
        .labelled("statement");

    // Empty statements between separators are allowed: `a = 1;; b = 2;`
    statement
        .or_not()
        .separated_by(just(Token::Semi))
        .collect::<Vec<_>>()
        .map(|stmts| stmts.into_iter().flatten().collect())
        .then_ignore(end())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn to_parse_errors(errors: Vec<Rich<'_, Token>>) -> Vec<ParseError> {
    errors
        .into_iter()
        .map(|e| {
            let span = e.span();
            ParseError {
                span: span.into_range(),
                message: e.to_string(),
            }
        })
        .collect()
}

/// Parse a token stream as a single condition expression.
pub fn parse_expression(
    tokens: &[(Token, std::ops::Range<usize>)],
) -> Result<Spanned<Expr>, Vec<ParseError>> {
    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let len = tokens.last().map_or(0, |(_, s)| s.end);
    let eoi: Span = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = expr_parser()
        .then_ignore(end())
        .parse(stream)
        .into_output_errors();

    match output {
        Some(expr) if errors.is_empty() => Ok(expr),
        _ => Err(to_parse_errors(errors)),
    }
}

/// Parse a token stream as a `;`-separated list of statements.
pub fn parse_statements(
    tokens: &[(Token, std::ops::Range<usize>)],
) -> Result<Vec<Spanned<Stmt>>, Vec<ParseError>> {
    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let len = tokens.last().map_or(0, |(_, s)| s.end);
    let eoi: Span = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = instruction_parser().parse(stream).into_output_errors();

    match output {
        Some(stmts) if errors.is_empty() => Ok(stmts),
        _ => Err(to_parse_errors(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn expr(source: &str) -> Expr {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        parse_expression(&tokens)
            .unwrap_or_else(|e| panic!("parse errors: {e:?}"))
            .node
    }

    fn stmts(source: &str) -> Vec<Stmt> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        parse_statements(&tokens)
            .unwrap_or_else(|e| panic!("parse errors: {e:?}"))
            .into_iter()
            .map(|s| s.node)
            .collect()
    }

    fn path(segments: &[&str]) -> Expr {
        Expr::Path(segments.iter().map(|s| s.to_string()).collect())
    }

    fn op_of(e: &Expr) -> BinaryOp {
        match e {
            Expr::Binary { op, .. } => *op,
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn parse_namespaced_variable() {
        assert_eq!(expr("GameState.awake"), path(&["GameState", "awake"]));
    }

    #[test]
    fn parse_call_with_args() {
        match expr("getProp(self, \"Health.Value\")") {
            Expr::Call { name, args } => {
                assert_eq!(name, "getProp");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].node, path(&["self"]));
                assert_eq!(
                    args[1].node,
                    Expr::Literal(Literal::String("Health.Value".into()))
                );
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_without_args() {
        assert_eq!(
            expr("resetAllSeenCounters()"),
            Expr::Call {
                name: "resetAllSeenCounters".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = expr("a || b && c");
        assert_eq!(op_of(&e), BinaryOp::Or);
        if let Expr::Binary { rhs, .. } = e {
            assert_eq!(op_of(&rhs.node), BinaryOp::And);
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = expr("1 + 2 * 3");
        assert_eq!(op_of(&e), BinaryOp::Add);
        if let Expr::Binary { lhs, rhs, .. } = e {
            assert_eq!(lhs.node, Expr::Literal(Literal::Int(1)));
            assert_eq!(op_of(&rhs.node), BinaryOp::Mul);
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let e = expr("10 - 3 - 2");
        if let Expr::Binary { lhs, rhs, op } = e {
            assert_eq!(op, BinaryOp::Sub);
            assert_eq!(op_of(&lhs.node), BinaryOp::Sub);
            assert_eq!(rhs.node, Expr::Literal(Literal::Int(2)));
        } else {
            panic!("expected binary");
        }
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        let e = expr("a < b == true");
        assert_eq!(op_of(&e), BinaryOp::Eq);
    }

    #[test]
    fn parentheses_override_precedence() {
        let e = expr("(1 + 2) * 3");
        assert_eq!(op_of(&e), BinaryOp::Mul);
    }

    #[test]
    fn prefix_operators_nest() {
        match expr("!!a") {
            Expr::Unary { op, operand } => {
                assert_eq!(op, UnaryOp::Not);
                assert!(matches!(operand.node, Expr::Unary { op: UnaryOp::Not, .. }));
            }
            other => panic!("expected unary, got {other:?}"),
        }
        assert!(matches!(expr("-5"), Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn binary_span_covers_operands() {
        let (tokens, _) = lex("a == 10");
        let parsed = parse_expression(&tokens).unwrap();
        assert_eq!(parsed.span, 0..7);
    }

    #[test]
    fn parse_assignments() {
        let parsed = stmts("GameState.gold += 5; x = true");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Stmt::Assign { target, op, value } => {
                assert_eq!(target.node, vec!["GameState".to_string(), "gold".to_string()]);
                assert_eq!(*op, AssignOp::Add);
                assert_eq!(value.node, Expr::Literal(Literal::Int(5)));
            }
            other => panic!("expected assign, got {other:?}"),
        }
        assert!(matches!(&parsed[1], Stmt::Assign { op: AssignOp::Set, .. }));
    }

    #[test]
    fn parse_steps_and_calls() {
        let parsed = stmts("a.b++; a.c--; print(\"hi\");");
        assert!(matches!(parsed[0], Stmt::Step { delta: 1, .. }));
        assert!(matches!(parsed[1], Stmt::Step { delta: -1, .. }));
        assert!(matches!(parsed[2], Stmt::Expr(_)));
    }

    #[test]
    fn empty_statements_are_skipped() {
        assert!(stmts("").is_empty());
        assert!(stmts(";;").is_empty());
        assert_eq!(stmts("a = 1;; b = 2;").len(), 2);
    }

    #[test]
    fn missing_operand_is_an_error() {
        let (tokens, _) = lex("a == ");
        let errors = parse_expression(&tokens).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn assignment_is_not_a_condition() {
        let (tokens, _) = lex("a = 1");
        assert!(parse_expression(&tokens).is_err());
    }

    #[test]
    fn unbalanced_parens_are_an_error() {
        let (tokens, _) = lex("x = (1 + 2");
        assert!(parse_statements(&tokens).is_err());
    }
}
