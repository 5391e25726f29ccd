mod builtins;
mod callable;
mod environment;
mod host;

use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{
    ast::{BinaryOp, Expression, Program, Statement},
    parser::{self, SyntaxError},
    tokenizer,
};

use self::callable::invoke;
pub use self::{
    callable::{Function, NativeFn, NativeFunction},
    environment::{Env, Environment},
    host::{Host, SystemHost},
};

#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Native(NativeFunction),
    Module(Rc<Module>),
}

/// A resolved module: the environment produced by executing a `.lark` file's
/// top level, or a builtin library's table. Shared by reference, so two
/// imports of the same name observe the same bindings.
pub struct Module {
    pub name: String,
    pub env: Env,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Stand-in for the absence of a value (a call that never returns); the
    /// empty string is falsy and prints as nothing.
    pub(crate) fn unit() -> Self {
        Value::String(String::new())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Function(_) => "a function",
            Value::Native(_) => "a native function",
            Value::Module(_) => "a module",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<fun {}>", function.name),
            Value::Native(native) => write!(f, "<native {}>", native.name),
            Value::Module(module) => write!(f, "<module {}>", module.name),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Arrays and modules can hold themselves; stay shallow.
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(items) => write!(f, "Array({:?})", Rc::as_ptr(items)),
            Value::Function(function) => write!(f, "Function({})", function.name),
            Value::Native(native) => write!(f, "Native({})", native.name),
            Value::Module(module) => write!(f, "Module({})", module.name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Undefined name \"{0}\"")]
    UndefinedName(String),
    #[error("\"{0}\" is not a module")]
    NotAModule(String),
    #[error("Module \"{module}\" has no member \"{member}\"")]
    UnknownMember { module: String, member: String },
    #[error("\"{0}\" is not callable")]
    NotCallable(String),
    #[error("{name} expects {expected} arguments but was called with {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Invalid operands: {lhs} {op} {rhs}")]
    InvalidOperands {
        op: BinaryOp,
        lhs: String,
        rhs: String,
    },
    #[error("{name}: {message}")]
    InvalidArgument {
        name: &'static str,
        message: String,
    },
    #[error("Module '{name}' not found. Available built-in modules: {}", available.join(", "))]
    ModuleNotFound {
        name: String,
        available: Vec<&'static str>,
    },
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One run's worth of interpreter state: the global environment, the module
/// cache, the source-file collection imports resolve against, the print
/// buffer, and the host capabilities.
pub struct Interpreter {
    globals: Env,
    modules: FxHashMap<String, Value>,
    sources: FxHashMap<String, String>,
    output: Vec<String>,
    pub(crate) host: Box<dyn Host>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(FxHashMap::default(), Box::new(SystemHost))
    }
}

impl Interpreter {
    /// `sources` maps logical file names (e.g. `"utils.lark"`) to source
    /// text for file-backed imports.
    pub fn new(sources: FxHashMap<String, String>, host: Box<dyn Host>) -> Self {
        Self {
            globals: Environment::root(),
            modules: FxHashMap::default(),
            sources,
            output: Vec::new(),
            host,
        }
    }

    /// Executes the program's statements against the global environment and
    /// returns everything printed, joined with newlines. A top-level
    /// `return` stops the run; its value is discarded.
    pub fn run(&mut self, program: &Program) -> Result<String, RuntimeError> {
        let globals = self.globals.clone();
        for statement in &program.0 {
            if self.execute(statement, &globals)?.is_some() {
                break;
            }
        }
        Ok(self.output.join("\n"))
    }

    /// `Some(value)` is a `return` propagating toward the enclosing call
    /// frame (or the top level).
    pub(crate) fn execute(
        &mut self,
        statement: &Statement,
        env: &Env,
    ) -> Result<Option<Value>, RuntimeError> {
        match statement {
            Statement::Import(name) => {
                let module = self.load_module(name)?;
                env.borrow_mut().set(name.clone(), module);
                Ok(None)
            }
            Statement::VarDecl(name, expr) | Statement::Assignment(name, expr) => {
                let value = self.evaluate(expr, env)?;
                env.borrow_mut().set(name.clone(), value);
                Ok(None)
            }
            Statement::If(condition, then_body, else_body) => {
                let body = if self.evaluate(condition, env)?.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                self.execute_body(body, env)
            }
            Statement::While(condition, body) => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Some(value) = self.execute_body(body, env)? {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
            Statement::FunDecl(name, params, body) => {
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    env: env.clone(),
                };
                env.borrow_mut()
                    .set(name.clone(), Value::Function(Rc::new(function)));
                Ok(None)
            }
            Statement::Print(expr) => {
                let value = self.evaluate(expr, env)?;
                self.output.push(value.to_string());
                Ok(None)
            }
            Statement::Return(expr) => Ok(Some(self.evaluate(expr, env)?)),
            Statement::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(None)
            }
        }
    }

    /// Neither branch bodies nor loop bodies open a scope of their own.
    fn execute_body(
        &mut self,
        body: &[Statement],
        env: &Env,
    ) -> Result<Option<Value>, RuntimeError> {
        for statement in body {
            if let Some(value) = self.execute(statement, env)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub(crate) fn evaluate(
        &mut self,
        expression: &Expression,
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Identifier(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| RuntimeError::UndefinedName(name.clone())),
            Expression::Binary(left, op, right) => {
                let lhs = self.evaluate(left, env)?;
                let rhs = self.evaluate(right, env)?;
                binary_op(*op, lhs, rhs)
            }
            Expression::Call(name, args) => {
                let callee = env
                    .borrow()
                    .get(name)
                    .ok_or_else(|| RuntimeError::UndefinedName(name.clone()))?;
                let args = self.evaluate_all(args, env)?;
                invoke(self, &callee, args, name)
            }
            Expression::ModuleAccess(module, member) => self.module_member(env, module, member),
            Expression::ModuleCall(module, member, args) => {
                let callee = self.module_member(env, module, member)?;
                let args = self.evaluate_all(args, env)?;
                invoke(self, &callee, args, &format!("{}.{}", module, member))
            }
        }
    }

    fn evaluate_all(
        &mut self,
        expressions: &[Expression],
        env: &Env,
    ) -> Result<Vec<Value>, RuntimeError> {
        expressions
            .iter()
            .map(|expr| self.evaluate(expr, env))
            .collect()
    }

    fn module_member(&self, env: &Env, module: &str, member: &str) -> Result<Value, RuntimeError> {
        let value = env
            .borrow()
            .get(module)
            .ok_or_else(|| RuntimeError::UndefinedName(module.to_string()))?;
        let Value::Module(resolved) = value else {
            return Err(RuntimeError::NotAModule(module.to_string()));
        };
        let value = resolved
            .env
            .borrow()
            .get_local(member)
            .ok_or_else(|| RuntimeError::UnknownMember {
                module: module.to_string(),
                member: member.to_string(),
            });
        value
    }

    /// Resolves an import: cache, then builtin library, then
    /// `<name>.lark` in the source collection. File-backed modules execute
    /// their top level once against a fresh isolated environment; every
    /// later import of the same name returns the same cached module.
    pub(crate) fn load_module(&mut self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module.clone());
        }

        if let Some(env) = builtins::library(name) {
            return Ok(self.cache_module(name, env));
        }

        let file = format!("{}.lark", name);
        let Some(source) = self.sources.get(&file).cloned() else {
            return Err(RuntimeError::ModuleNotFound {
                name: name.to_string(),
                available: builtins::BUILTIN_MODULES.to_vec(),
            });
        };

        let program = parser::program(&tokenizer::tokens(&source))?;
        let env = Environment::root();
        for statement in &program.0 {
            // Module top level follows run semantics: a bare return stops
            // execution of the rest of the file.
            if self.execute(statement, &env)?.is_some() {
                break;
            }
        }
        Ok(self.cache_module(name, env))
    }

    fn cache_module(&mut self, name: &str, env: Env) -> Value {
        let module = Value::Module(Rc::new(Module {
            name: name.to_string(),
            env,
        }));
        self.modules.insert(name.to_string(), module.clone());
        module
    }
}

pub(crate) fn binary_op(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Plus => add(lhs, rhs),
        BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide => arithmetic(op, lhs, rhs),
        BinaryOp::Equal => Ok(bool_value(values_equal(&lhs, &rhs))),
        BinaryOp::NotEqual => Ok(bool_value(!values_equal(&lhs, &rhs))),
        BinaryOp::Greater | BinaryOp::Less | BinaryOp::GreaterEqual | BinaryOp::LessEqual => {
            ordering(op, lhs, rhs)
        }
    }
}

/// `+` is numeric addition unless either side is a string, in which case
/// both sides coerce to text and concatenate.
pub(crate) fn add(lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (lhs @ Value::String(_), rhs) | (lhs, rhs @ Value::String(_)) => {
            Ok(Value::String(format!("{}{}", lhs, rhs)))
        }
        (lhs, rhs) => Err(RuntimeError::InvalidOperands {
            op: BinaryOp::Plus,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        // Division by zero follows IEEE semantics and never fails.
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
            BinaryOp::Minus => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            _ => unreachable!("arithmetic is only called for - * /"),
        })),
        _ => Err(RuntimeError::InvalidOperands {
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }),
    }
}

fn ordering(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(bool_value(match op {
            BinaryOp::Greater => a > b,
            BinaryOp::Less => a < b,
            BinaryOp::GreaterEqual => a >= b,
            BinaryOp::LessEqual => a <= b,
            _ => unreachable!("ordering is only called for > < >= <="),
        })),
        _ => Err(RuntimeError::InvalidOperands {
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }),
    }
}

/// Comparisons yield 1 or 0; the value set has no boolean.
pub(crate) fn bool_value(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

/// Structural equality for same-typed values, textual equality across
/// types.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        _ => a.to_string() == b.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::String("0".to_string()).is_truthy());
        assert!(Value::array(Vec::new()).is_truthy());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn test_array_formatting() {
        let value = Value::array(vec![
            Value::Number(1.0),
            Value::String("two".to_string()),
            Value::array(vec![Value::Number(3.0)]),
        ]);
        assert_eq!(value.to_string(), "[1, two, [3]]");
    }

    #[test]
    fn test_add_concatenates_when_either_side_is_a_string() {
        let sum = add(Value::String("a".to_string()), Value::Number(1.0)).unwrap();
        assert_eq!(sum.to_string(), "a1");
        let sum = add(Value::Number(1.0), Value::String("a".to_string())).unwrap();
        assert_eq!(sum.to_string(), "1a");
    }

    #[test]
    fn test_add_rejects_non_numeric_non_string_operands() {
        assert!(add(Value::array(Vec::new()), Value::Number(1.0)).is_err());
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        let quotient = binary_op(BinaryOp::Divide, Value::Number(1.0), Value::Number(0.0));
        assert!(matches!(quotient, Ok(Value::Number(n)) if n.is_infinite()));
    }

    #[test]
    fn test_comparisons_yield_one_or_zero() {
        let result = binary_op(BinaryOp::Less, Value::Number(1.0), Value::Number(2.0)).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 1.0));
        let result = binary_op(BinaryOp::Greater, Value::Number(1.0), Value::Number(2.0)).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 0.0));
    }

    #[test]
    fn test_ordering_on_strings_is_a_type_error() {
        let result = binary_op(
            BinaryOp::Less,
            Value::String("a".to_string()),
            Value::String("b".to_string()),
        );
        assert!(matches!(result, Err(RuntimeError::InvalidOperands { .. })));
    }

    #[test]
    fn test_arrays_compare_structurally() {
        let a = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let c = Value::array(vec![Value::Number(1.0)]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &c));
    }
}
