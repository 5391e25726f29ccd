use std::fmt::Display;

#[derive(Debug)]
pub struct Program(pub Vec<Statement>);

#[derive(Debug, Clone)]
pub enum Statement {
    Import(String),
    VarDecl(String, Expression),
    Assignment(String, Expression),
    If(Expression, Vec<Statement>, Vec<Statement>),
    While(Expression, Vec<Statement>),
    FunDecl(String, Vec<String>, Vec<Statement>),
    Print(Expression),
    Return(Expression),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Number(f64),
    String(String),
    Identifier(String),
    Binary(Box<Expression>, BinaryOp, Box<Expression>),
    Call(String, Vec<Expression>),
    ModuleAccess(String, String),
    ModuleCall(String, String, Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Greater,
    Less,
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn comparison(lexeme: &str) -> Option<Self> {
        match lexeme {
            ">" => Some(BinaryOp::Greater),
            "<" => Some(BinaryOp::Less),
            "==" => Some(BinaryOp::Equal),
            "!=" => Some(BinaryOp::NotEqual),
            ">=" => Some(BinaryOp::GreaterEqual),
            "<=" => Some(BinaryOp::LessEqual),
            _ => None,
        }
    }

    pub fn additive(lexeme: &str) -> Option<Self> {
        match lexeme {
            "+" => Some(BinaryOp::Plus),
            "-" => Some(BinaryOp::Minus),
            _ => None,
        }
    }

    pub fn multiplicative(lexeme: &str) -> Option<Self> {
        match lexeme {
            "*" => Some(BinaryOp::Multiply),
            "/" => Some(BinaryOp::Divide),
            _ => None,
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for statement in &self.0 {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

fn write_block(f: &mut std::fmt::Formatter<'_>, statements: &[Statement]) -> std::fmt::Result {
    for statement in statements {
        writeln!(f, "{}", statement)?;
    }
    Ok(())
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Import(module) => write!(f, "import {}", module),
            Statement::VarDecl(name, expr) => write!(f, "let {} = {}", name, expr),
            Statement::Assignment(name, expr) => write!(f, "{} = {}", name, expr),
            Statement::If(condition, then_body, else_body) => {
                writeln!(f, "if {} then", condition)?;
                write_block(f, then_body)?;
                if !else_body.is_empty() {
                    writeln!(f, "else")?;
                    write_block(f, else_body)?;
                }
                write!(f, "end")
            }
            Statement::While(condition, body) => {
                writeln!(f, "while {} do", condition)?;
                write_block(f, body)?;
                write!(f, "end")
            }
            Statement::FunDecl(name, params, body) => {
                writeln!(f, "fun {}({}) do", name, params.join(", "))?;
                write_block(f, body)?;
                write!(f, "end")
            }
            Statement::Print(expr) => write!(f, "print({})", expr),
            Statement::Return(expr) => write!(f, "return {}", expr),
            Statement::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

fn write_args(f: &mut std::fmt::Formatter<'_>, args: &[Expression]) -> std::fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        write!(f, "{}", arg)?;
        if i != args.len() - 1 {
            write!(f, ", ")?;
        }
    }
    Ok(())
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::String(s) => write!(f, "\"{}\"", s),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Binary(left, op, right) => write!(f, "({} {} {})", left, op, right),
            Expression::Call(name, args) => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expression::ModuleAccess(module, member) => write!(f, "{}.{}", module, member),
            Expression::ModuleCall(module, member, args) => {
                write!(f, "{}.{}(", module, member)?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Greater => write!(f, ">"),
            BinaryOp::Less => write!(f, "<"),
            BinaryOp::Equal => write!(f, "=="),
            BinaryOp::NotEqual => write!(f, "!="),
            BinaryOp::GreaterEqual => write!(f, ">="),
            BinaryOp::LessEqual => write!(f, "<="),
            BinaryOp::Plus => write!(f, "+"),
            BinaryOp::Minus => write!(f, "-"),
            BinaryOp::Multiply => write!(f, "*"),
            BinaryOp::Divide => write!(f, "/"),
        }
    }
}
