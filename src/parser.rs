use crate::{
    ast::{BinaryOp, Expression, Program, Statement},
    tokenizer::{Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Expected {expected} but found \"{found}\" at offset {offset}")]
    Expected {
        expected: String,
        found: String,
        offset: usize,
    },
    #[error("Expected {expected} but reached the end of input")]
    UnexpectedEnd { expected: String },
    #[error("Unexpected token \"{found}\" at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },
}

impl SyntaxError {
    fn expected(expected: impl Into<String>, found: Option<&Token>) -> Self {
        let expected = expected.into();
        match found {
            Some(token) => SyntaxError::Expected {
                expected,
                found: token.lexeme.clone(),
                offset: token.offset,
            },
            None => SyntaxError::UnexpectedEnd { expected },
        }
    }

    fn unexpected(found: Option<&Token>) -> Self {
        match found {
            Some(token) => SyntaxError::UnexpectedToken {
                found: token.lexeme.clone(),
                offset: token.offset,
            },
            None => SyntaxError::UnexpectedEnd {
                expected: "a statement".to_string(),
            },
        }
    }
}

pub fn program(tokens: &[Token]) -> Result<Program, SyntaxError> {
    let mut statements = Vec::new();
    let mut tokens = tokens;

    while !tokens.is_empty() {
        let (stmt, rest) = statement(tokens)?;
        statements.push(stmt);
        tokens = rest;
    }

    Ok(Program(statements))
}

fn statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let Some(token) = tokens.first() else {
        return Err(SyntaxError::unexpected(None));
    };

    match token.kind {
        TokenKind::Keyword => match token.lexeme.as_str() {
            "import" => import_statement(&tokens[1..]),
            "let" => var_declaration(&tokens[1..]),
            "if" => if_statement(&tokens[1..]),
            "while" => while_statement(&tokens[1..]),
            "fun" => fun_declaration(&tokens[1..]),
            "print" => print_statement(&tokens[1..]),
            "return" => {
                let (expr, rest) = expression(&tokens[1..])?;
                Ok((Statement::Return(expr), rest))
            }
            // A block terminator (`then`, `else`, `end`, `do`) cannot open
            // a statement.
            _ => Err(SyntaxError::unexpected(Some(token))),
        },
        TokenKind::Identifier => identifier_statement(tokens),
        _ => Err(SyntaxError::unexpected(Some(token))),
    }
}

/// An identifier-led statement is either an assignment (`x = expr`) or a
/// bare expression statement (`x(...)`, `x.member`, `x.member(...)`). The
/// parser commits after one token of lookahead; in the expression case the
/// identifier is reparsed as the head of a full expression by handing the
/// unconsumed slice back to `expression` (the grammar's single rewind).
fn identifier_statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let name = &tokens[0].lexeme;
    match tokens.get(1) {
        Some(token) if token.is_operator("=") => {
            let (expr, rest) = expression(&tokens[2..])?;
            Ok((Statement::Assignment(name.clone(), expr), rest))
        }
        Some(token) if matches!(token.kind, TokenKind::LeftParen | TokenKind::Dot) => {
            let (expr, rest) = expression(tokens)?;
            Ok((Statement::Expression(expr), rest))
        }
        _ => Err(SyntaxError::unexpected(tokens.first())),
    }
}

fn import_statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let (module, rest) = match_identifier(tokens, "a module name")?;
    Ok((Statement::Import(module), rest))
}

fn var_declaration(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let (name, tokens) = match_identifier(tokens, "a variable name")?;
    let tokens = consume_operator(tokens, "=")?;
    let (expr, tokens) = expression(tokens)?;
    Ok((Statement::VarDecl(name, expr), tokens))
}

fn if_statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let (condition, tokens) = expression(tokens)?;
    let tokens = consume_keyword(tokens, "then")?;
    let (then_body, tokens) = block(tokens, &["else", "end"])?;
    let (else_body, tokens) = if tokens[0].is_keyword("else") {
        block(&tokens[1..], &["end"])?
    } else {
        (Vec::new(), tokens)
    };
    let tokens = consume_keyword(tokens, "end")?;
    Ok((Statement::If(condition, then_body, else_body), tokens))
}

fn while_statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let (condition, tokens) = expression(tokens)?;
    let tokens = consume_keyword(tokens, "do")?;
    let (body, tokens) = block(tokens, &["end"])?;
    let tokens = consume_keyword(tokens, "end")?;
    Ok((Statement::While(condition, body), tokens))
}

fn fun_declaration(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let (name, tokens) = match_identifier(tokens, "a function name")?;
    let mut tokens = consume(tokens, TokenKind::LeftParen)?;

    let mut params = Vec::new();
    while !peek_is(tokens, TokenKind::RightParen) {
        let (param, rest) = match_identifier(tokens, "a parameter name")?;
        params.push(param);
        tokens = rest;
        if peek_is(tokens, TokenKind::Comma) {
            tokens = &tokens[1..];
        }
    }
    let tokens = consume(tokens, TokenKind::RightParen)?;

    let tokens = consume_keyword(tokens, "do")?;
    let (body, tokens) = block(tokens, &["end"])?;
    let tokens = consume_keyword(tokens, "end")?;
    Ok((Statement::FunDecl(name, params, body), tokens))
}

fn print_statement(tokens: &[Token]) -> Result<(Statement, &[Token]), SyntaxError> {
    let tokens = consume(tokens, TokenKind::LeftParen)?;
    let (expr, tokens) = expression(tokens)?;
    let tokens = consume(tokens, TokenKind::RightParen)?;
    Ok((Statement::Print(expr), tokens))
}

/// Collects statements until one of the terminator keywords is peeked. The
/// terminator is left for the caller to consume.
fn block<'a>(
    tokens: &'a [Token],
    terminators: &[&str],
) -> Result<(Vec<Statement>, &'a [Token]), SyntaxError> {
    let mut statements = Vec::new();
    let mut tokens = tokens;

    loop {
        match tokens.first() {
            None => {
                return Err(SyntaxError::UnexpectedEnd {
                    expected: format!("\"{}\"", terminators.join("\" or \"")),
                })
            }
            Some(token) if terminators.iter().any(|t| token.is_keyword(t)) => {
                return Ok((statements, tokens))
            }
            _ => {
                let (stmt, rest) = statement(tokens)?;
                statements.push(stmt);
                tokens = rest;
            }
        }
    }
}

fn expression(tokens: &[Token]) -> Result<(Expression, &[Token]), SyntaxError> {
    comparison(tokens)
}

fn binary<'a>(
    precedence: impl Fn(&'a [Token]) -> Result<(Expression, &'a [Token]), SyntaxError>,
    operator: impl Fn(&Token) -> Option<BinaryOp>,
    tokens: &'a [Token],
) -> Result<(Expression, &'a [Token]), SyntaxError> {
    let (mut expr, mut tokens) = precedence(tokens)?;

    while let Some(token) = tokens.first() {
        let op = match operator(token) {
            Some(op) => op,
            None => break,
        };
        let (right, rest) = precedence(&tokens[1..])?;
        expr = Expression::Binary(Box::new(expr), op, Box::new(right));
        tokens = rest;
    }

    Ok((expr, tokens))
}

fn comparison(tokens: &[Token]) -> Result<(Expression, &[Token]), SyntaxError> {
    binary(
        additive,
        |token| match token.kind {
            TokenKind::Operator => BinaryOp::comparison(&token.lexeme),
            _ => None,
        },
        tokens,
    )
}

fn additive(tokens: &[Token]) -> Result<(Expression, &[Token]), SyntaxError> {
    binary(
        multiplicative,
        |token| match token.kind {
            TokenKind::Operator => BinaryOp::additive(&token.lexeme),
            _ => None,
        },
        tokens,
    )
}

fn multiplicative(tokens: &[Token]) -> Result<(Expression, &[Token]), SyntaxError> {
    binary(
        primary,
        |token| match token.kind {
            TokenKind::Operator => BinaryOp::multiplicative(&token.lexeme),
            _ => None,
        },
        tokens,
    )
}

fn primary(tokens: &[Token]) -> Result<(Expression, &[Token]), SyntaxError> {
    let Some(token) = tokens.first() else {
        return Err(SyntaxError::UnexpectedEnd {
            expected: "an expression".to_string(),
        });
    };

    match token.kind {
        TokenKind::Number => {
            let n = token
                .lexeme
                .parse()
                .expect("lexer only emits digit-run number lexemes");
            Ok((Expression::Number(n), &tokens[1..]))
        }
        TokenKind::String => Ok((Expression::String(token.lexeme.clone()), &tokens[1..])),
        TokenKind::LeftParen => {
            let (expr, rest) = expression(&tokens[1..])?;
            let rest = consume(rest, TokenKind::RightParen)?;
            Ok((expr, rest))
        }
        TokenKind::Identifier => identifier_expression(&token.lexeme, &tokens[1..]),
        _ => Err(SyntaxError::expected("an expression", Some(token))),
    }
}

/// `name`, `name(args)`, `name.member`, or `name.member(args)`.
fn identifier_expression<'a>(
    name: &str,
    tokens: &'a [Token],
) -> Result<(Expression, &'a [Token]), SyntaxError> {
    if peek_is(tokens, TokenKind::Dot) {
        let (member, rest) = match_identifier(&tokens[1..], "a module member name")?;
        if peek_is(rest, TokenKind::LeftParen) {
            let (args, rest) = arguments(&rest[1..])?;
            return Ok((
                Expression::ModuleCall(name.to_string(), member, args),
                rest,
            ));
        }
        return Ok((Expression::ModuleAccess(name.to_string(), member), rest));
    }

    if peek_is(tokens, TokenKind::LeftParen) {
        let (args, rest) = arguments(&tokens[1..])?;
        return Ok((Expression::Call(name.to_string(), args), rest));
    }

    Ok((Expression::Identifier(name.to_string()), tokens))
}

/// Argument list after a consumed `(`. Commas separate arguments but may
/// be omitted.
fn arguments(tokens: &[Token]) -> Result<(Vec<Expression>, &[Token]), SyntaxError> {
    let mut args = Vec::new();
    let mut tokens = tokens;

    while !peek_is(tokens, TokenKind::RightParen) {
        let (arg, rest) = expression(tokens)?;
        args.push(arg);
        tokens = rest;
        if peek_is(tokens, TokenKind::Comma) {
            tokens = &tokens[1..];
        }
    }

    Ok((args, &tokens[1..]))
}

fn peek_is(tokens: &[Token], kind: TokenKind) -> bool {
    tokens.first().map(|t| t.kind) == Some(kind)
}

fn consume(tokens: &[Token], kind: TokenKind) -> Result<&[Token], SyntaxError> {
    match tokens.first() {
        Some(token) if token.kind == kind => Ok(&tokens[1..]),
        found => Err(SyntaxError::expected(format!("\"{}\"", kind), found)),
    }
}

fn consume_keyword<'a>(tokens: &'a [Token], word: &str) -> Result<&'a [Token], SyntaxError> {
    match tokens.first() {
        Some(token) if token.is_keyword(word) => Ok(&tokens[1..]),
        found => Err(SyntaxError::expected(format!("\"{}\"", word), found)),
    }
}

fn consume_operator<'a>(tokens: &'a [Token], op: &str) -> Result<&'a [Token], SyntaxError> {
    match tokens.first() {
        Some(token) if token.is_operator(op) => Ok(&tokens[1..]),
        found => Err(SyntaxError::expected(format!("\"{}\"", op), found)),
    }
}

fn match_identifier<'a>(
    tokens: &'a [Token],
    what: &str,
) -> Result<(String, &'a [Token]), SyntaxError> {
    match tokens.first() {
        Some(token) if token.kind == TokenKind::Identifier => {
            Ok((token.lexeme.clone(), &tokens[1..]))
        }
        found => Err(SyntaxError::expected(what, found)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokenizer::tokens;

    fn parse(source: &str) -> Result<Program, SyntaxError> {
        program(&tokens(source))
    }

    fn parse_one(source: &str) -> Statement {
        let mut program = parse(source).expect("program should parse");
        assert_eq!(program.0.len(), 1);
        program.0.remove(0)
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let Statement::Print(expr) = parse_one("print(1 + 2 * 3)") else {
            panic!("expected print statement");
        };
        assert_eq!(expr.to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let Statement::Print(expr) = parse_one("print((1 + 2) * 3)") else {
            panic!("expected print statement");
        };
        assert_eq!(expr.to_string(), "((1 + 2) * 3)");
    }

    #[test]
    fn test_comparison_is_lowest_precedence() {
        let Statement::Print(expr) = parse_one("print(1 + 2 < 3 * 4)") else {
            panic!("expected print statement");
        };
        assert_eq!(expr.to_string(), "((1 + 2) < (3 * 4))");
    }

    #[test]
    fn test_identifier_statement_commits_to_assignment_on_equals() {
        assert!(matches!(
            parse_one("x = 1 + 2"),
            Statement::Assignment(name, _) if name == "x"
        ));
    }

    #[test]
    fn test_identifier_statement_rewinds_into_call_expression() {
        let Statement::Expression(Expression::Call(name, args)) = parse_one("foo(1, 2)") else {
            panic!("expected call expression statement");
        };
        assert_eq!(name, "foo");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_identifier_statement_rewinds_into_module_call() {
        assert!(matches!(
            parse_one("math.sqrt(16)"),
            Statement::Expression(Expression::ModuleCall(module, member, _))
                if module == "math" && member == "sqrt"
        ));
    }

    #[test]
    fn test_module_access_without_call() {
        assert!(matches!(
            parse_one("let x = math.pi"),
            Statement::VarDecl(name, Expression::ModuleAccess(module, member))
                if name == "x" && module == "math" && member == "pi"
        ));
    }

    #[test]
    fn test_bare_identifier_statement_is_an_error() {
        assert!(parse("x").is_err());
    }

    #[test]
    fn test_coalesced_operator_run_is_rejected() {
        // `+-` lexes as one opaque operator no precedence tier accepts.
        assert!(parse("let x = 1+-2").is_err());
    }

    #[test]
    fn test_if_with_else() {
        let Statement::If(_, then_body, else_body) =
            parse_one("if x < 1 then print(1) else print(2) end")
        else {
            panic!("expected if statement");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_if_without_else() {
        let Statement::If(_, then_body, else_body) = parse_one("if x < 1 then print(1) end")
        else {
            panic!("expected if statement");
        };
        assert_eq!(then_body.len(), 1);
        assert!(else_body.is_empty());
    }

    #[test]
    fn test_fun_declaration() {
        let Statement::FunDecl(name, params, body) = parse_one("fun add(a, b) do return a + b end")
        else {
            panic!("expected function declaration");
        };
        assert_eq!(name, "add");
        assert_eq!(params, vec!["a", "b"]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_unterminated_block_reports_end_of_input() {
        assert!(matches!(
            parse("while x < 3 do print(x)"),
            Err(SyntaxError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_missing_then_reports_offending_token() {
        assert!(matches!(
            parse("if x < 1 print(1) end"),
            Err(SyntaxError::Expected { expected, .. }) if expected == "\"then\""
        ));
    }

    #[test]
    fn test_statement_cannot_start_with_block_terminator() {
        assert!(parse("end").is_err());
    }
}
