use std::fmt::Debug;

use crate::ast::Statement;

use super::{
    environment::{Env, Environment},
    Interpreter, RuntimeError, Value,
};

/// An interpreted function: parameter names, body, and the environment
/// captured at its declaration site.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub env: Env,
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A host function exposed by a builtin library. Receives already-evaluated
/// arguments plus the interpreter, whose host provides randomness, the
/// clock, and line input.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub f: NativeFn,
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// The single dispatch point for calling a value, interpreted or native.
/// `name` is the source-level callee name, used only for diagnostics.
pub fn invoke(
    interpreter: &mut Interpreter,
    callee: &Value,
    args: Vec<Value>,
    name: &str,
) -> Result<Value, RuntimeError> {
    match callee {
        Value::Function(function) => call_function(interpreter, function, args),
        Value::Native(native) => (native.f)(interpreter, &args),
        _ => Err(RuntimeError::NotCallable(name.to_string())),
    }
}

fn call_function(
    interpreter: &mut Interpreter,
    function: &Function,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    if args.len() != function.params.len() {
        return Err(RuntimeError::ArityMismatch {
            name: function.name.clone(),
            expected: function.params.len(),
            got: args.len(),
        });
    }

    let env = Environment::child(function.env.clone());
    for (param, value) in function.params.iter().zip(args) {
        env.borrow_mut().set(param.clone(), value);
    }

    for statement in &function.body {
        if let Some(value) = interpreter.execute(statement, &env)? {
            return Ok(value);
        }
    }
    Ok(Value::unit())
}
