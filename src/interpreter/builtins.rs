use std::{cell::RefCell, rc::Rc};

use chrono::{Datelike, Timelike};

use super::{
    bool_value,
    callable::{NativeFn, NativeFunction},
    environment::{Env, Environment},
    RuntimeError, Value,
};

pub const BUILTIN_MODULES: [&str; 6] = ["math", "random", "string", "array", "time", "input"];

pub fn library(name: &str) -> Option<Env> {
    match name {
        "math" => Some(math()),
        "random" => Some(random()),
        "string" => Some(string()),
        "array" => Some(array()),
        "time" => Some(time()),
        "input" => Some(input()),
        _ => None,
    }
}

fn library_env(natives: &[(&'static str, NativeFn)]) -> Env {
    let env = Environment::root();
    {
        let mut bindings = env.borrow_mut();
        for &(name, f) in natives {
            bindings.set(name, Value::Native(NativeFunction { name, f }));
        }
    }
    env
}

fn math() -> Env {
    let env = library_env(&[
        ("sqrt", |_, args| {
            Ok(Value::Number(number_arg("sqrt", args, 0)?.sqrt()))
        }),
        ("pow", |_, args| {
            let base = number_arg("pow", args, 0)?;
            let exponent = number_arg("pow", args, 1)?;
            Ok(Value::Number(base.powf(exponent)))
        }),
        ("abs", |_, args| {
            Ok(Value::Number(number_arg("abs", args, 0)?.abs()))
        }),
        ("floor", |_, args| {
            Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
        }),
        ("ceil", |_, args| {
            Ok(Value::Number(number_arg("ceil", args, 0)?.ceil()))
        }),
        ("round", |_, args| {
            // Half rounds toward positive infinity.
            Ok(Value::Number((number_arg("round", args, 0)? + 0.5).floor()))
        }),
        ("sin", |_, args| {
            Ok(Value::Number(number_arg("sin", args, 0)?.sin()))
        }),
        ("cos", |_, args| {
            Ok(Value::Number(number_arg("cos", args, 0)?.cos()))
        }),
        ("tan", |_, args| {
            Ok(Value::Number(number_arg("tan", args, 0)?.tan()))
        }),
        ("max", |_, args| {
            let mut best = f64::NEG_INFINITY;
            for index in 0..args.len() {
                best = best.max(number_arg("max", args, index)?);
            }
            Ok(Value::Number(best))
        }),
        ("min", |_, args| {
            let mut best = f64::INFINITY;
            for index in 0..args.len() {
                best = best.min(number_arg("min", args, index)?);
            }
            Ok(Value::Number(best))
        }),
    ]);
    {
        let mut bindings = env.borrow_mut();
        bindings.set("pi", Value::Number(3.14159265359));
        bindings.set("e", Value::Number(2.71828182846));
    }
    env
}

fn random() -> Env {
    library_env(&[
        ("random", |interp, _| Ok(Value::Number(interp.host.random()))),
        ("randint", |interp, args| {
            let min = number_arg("randint", args, 0)?;
            let max = number_arg("randint", args, 1)?;
            let r = interp.host.random();
            Ok(Value::Number((r * (max - min + 1.0)).floor() + min))
        }),
        ("choice", |interp, args| match arg("choice", args, 0)? {
            Value::Array(items) => {
                let index = pick_index("choice", interp.host.random(), items.borrow().len())?;
                let item = items.borrow()[index].clone();
                Ok(item)
            }
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let index = pick_index("choice", interp.host.random(), chars.len())?;
                Ok(Value::String(chars[index].to_string()))
            }
            other => Err(invalid(
                "choice",
                format!("expected an array or string, got {}", other.type_name()),
            )),
        }),
        ("shuffle", |interp, args| {
            // Fisher-Yates over a copy; the input array is left untouched.
            let mut items = array_arg("shuffle", args, 0)?.borrow().clone();
            for i in (1..items.len()).rev() {
                let j = (interp.host.random() * (i + 1) as f64).floor() as usize;
                items.swap(i, j.min(i));
            }
            Ok(Value::array(items))
        }),
    ])
}

fn string() -> Env {
    library_env(&[
        ("len", |_, args| {
            Ok(Value::Number(
                text_arg("len", args, 0)?.chars().count() as f64
            ))
        }),
        ("upper", |_, args| {
            Ok(Value::String(text_arg("upper", args, 0)?.to_uppercase()))
        }),
        ("lower", |_, args| {
            Ok(Value::String(text_arg("lower", args, 0)?.to_lowercase()))
        }),
        ("reverse", |_, args| {
            Ok(Value::String(
                text_arg("reverse", args, 0)?.chars().rev().collect(),
            ))
        }),
        ("replace", |_, args| {
            let s = text_arg("replace", args, 0)?;
            let old = text_arg("replace", args, 1)?;
            let new = text_arg("replace", args, 2)?;
            // First occurrence only.
            Ok(Value::String(s.replacen(&old, &new, 1)))
        }),
        ("split", |_, args| {
            let s = text_arg("split", args, 0)?;
            let delim = text_arg("split", args, 1)?;
            let parts: Vec<Value> = if delim.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(delim.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            };
            Ok(Value::array(parts))
        }),
        ("join", |_, args| {
            let items = array_arg("join", args, 0)?;
            let delim = text_arg("join", args, 1)?;
            let joined = items
                .borrow()
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&delim);
            Ok(Value::String(joined))
        }),
        ("startswith", |_, args| {
            let s = text_arg("startswith", args, 0)?;
            let prefix = text_arg("startswith", args, 1)?;
            Ok(bool_value(s.starts_with(&prefix)))
        }),
        ("endswith", |_, args| {
            let s = text_arg("endswith", args, 0)?;
            let suffix = text_arg("endswith", args, 1)?;
            Ok(bool_value(s.ends_with(&suffix)))
        }),
        ("substring", |_, args| {
            let s = text_arg("substring", args, 0)?;
            let chars: Vec<char> = s.chars().collect();
            let a = clamp_index(number_arg("substring", args, 1)?, chars.len());
            let b = clamp_index(number_arg("substring", args, 2)?, chars.len());
            // Out-of-range bounds clamp and a reversed range swaps.
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Ok(Value::String(chars[start..end].iter().collect()))
        }),
    ])
}

fn array() -> Env {
    library_env(&[
        ("create", |_, args| Ok(Value::array(args.to_vec()))),
        ("length", |_, args| {
            Ok(Value::Number(
                array_arg("length", args, 0)?.borrow().len() as f64
            ))
        }),
        ("push", |_, args| {
            let items = array_arg("push", args, 0)?;
            let item = arg("push", args, 1)?.clone();
            items.borrow_mut().push(item);
            Ok(Value::Array(items))
        }),
        ("pop", |_, args| {
            array_arg("pop", args, 0)?
                .borrow_mut()
                .pop()
                .ok_or_else(|| invalid("pop", "cannot pop from an empty array"))
        }),
        ("sum", |_, args| {
            let items = array_arg("sum", args, 0)?;
            let mut total = Value::Number(0.0);
            for item in items.borrow().iter() {
                total = super::add(total, item.clone())?;
            }
            Ok(total)
        }),
        ("avg", |_, args| {
            let numbers = numbers_arg("avg", args, 0)?;
            Ok(Value::Number(
                numbers.iter().sum::<f64>() / numbers.len() as f64,
            ))
        }),
        ("max", |_, args| {
            let numbers = numbers_arg("max", args, 0)?;
            Ok(Value::Number(
                numbers.iter().fold(f64::NEG_INFINITY, |a, b| a.max(*b)),
            ))
        }),
        ("min", |_, args| {
            let numbers = numbers_arg("min", args, 0)?;
            Ok(Value::Number(
                numbers.iter().fold(f64::INFINITY, |a, b| a.min(*b)),
            ))
        }),
        ("sort", |_, args| {
            let mut numbers = numbers_arg("sort", args, 0)?;
            numbers.sort_by(f64::total_cmp);
            Ok(Value::array(numbers.into_iter().map(Value::Number).collect()))
        }),
        ("reverse", |_, args| {
            let items = array_arg("reverse", args, 0)?;
            let reversed: Vec<Value> = items.borrow().iter().rev().cloned().collect();
            Ok(Value::array(reversed))
        }),
        ("contains", |_, args| {
            let items = array_arg("contains", args, 0)?;
            let needle = arg("contains", args, 1)?;
            let found = items
                .borrow()
                .iter()
                .any(|item| super::values_equal(item, needle));
            Ok(bool_value(found))
        }),
    ])
}

fn time() -> Env {
    library_env(&[
        ("now", |interp, _| {
            Ok(Value::Number(interp.host.now().timestamp_millis() as f64))
        }),
        ("timestamp", |interp, _| {
            Ok(Value::Number(interp.host.now().timestamp() as f64))
        }),
        ("year", |interp, _| {
            Ok(Value::Number(interp.host.now().year() as f64))
        }),
        ("month", |interp, _| {
            Ok(Value::Number(interp.host.now().month() as f64))
        }),
        ("day", |interp, _| {
            Ok(Value::Number(interp.host.now().day() as f64))
        }),
        ("hour", |interp, _| {
            Ok(Value::Number(interp.host.now().hour() as f64))
        }),
        ("minute", |interp, _| {
            Ok(Value::Number(interp.host.now().minute() as f64))
        }),
        ("second", |interp, _| {
            Ok(Value::Number(interp.host.now().second() as f64))
        }),
    ])
}

fn input() -> Env {
    library_env(&[
        ("prompt", |interp, args| {
            let message = text_arg("prompt", args, 0)?;
            Ok(Value::String(interp.host.read_line(&message)?))
        }),
        ("number", |interp, args| {
            let message = text_arg("number", args, 0)?;
            let line = interp.host.read_line(&message)?;
            Ok(Value::Number(line.trim().parse().unwrap_or(0.0)))
        }),
        ("int", |interp, args| {
            let message = text_arg("int", args, 0)?;
            let line = interp.host.read_line(&message)?;
            let n: f64 = line.trim().parse().unwrap_or(0.0);
            Ok(Value::Number(n.trunc()))
        }),
    ])
}

fn invalid(name: &'static str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidArgument {
        name,
        message: message.into(),
    }
}

fn arg<'a>(name: &'static str, args: &'a [Value], index: usize) -> Result<&'a Value, RuntimeError> {
    args.get(index)
        .ok_or_else(|| invalid(name, format!("missing argument {}", index + 1)))
}

fn number_arg(name: &'static str, args: &[Value], index: usize) -> Result<f64, RuntimeError> {
    match arg(name, args, index)? {
        Value::Number(n) => Ok(*n),
        other => Err(invalid(
            name,
            format!(
                "argument {} must be a number, got {}",
                index + 1,
                other.type_name()
            ),
        )),
    }
}

fn array_arg(
    name: &'static str,
    args: &[Value],
    index: usize,
) -> Result<Rc<RefCell<Vec<Value>>>, RuntimeError> {
    match arg(name, args, index)? {
        Value::Array(items) => Ok(items.clone()),
        other => Err(invalid(
            name,
            format!(
                "argument {} must be an array, got {}",
                index + 1,
                other.type_name()
            ),
        )),
    }
}

fn numbers_arg(name: &'static str, args: &[Value], index: usize) -> Result<Vec<f64>, RuntimeError> {
    array_arg(name, args, index)?
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Number(n) => Ok(*n),
            other => Err(invalid(
                name,
                format!("expected an array of numbers, got {}", other.type_name()),
            )),
        })
        .collect()
}

/// Textual coercion: any value is accepted and rendered to its printed form.
fn text_arg(name: &'static str, args: &[Value], index: usize) -> Result<String, RuntimeError> {
    Ok(arg(name, args, index)?.to_string())
}

fn pick_index(name: &'static str, r: f64, len: usize) -> Result<usize, RuntimeError> {
    if len == 0 {
        return Err(invalid(name, "cannot pick from an empty sequence"));
    }
    Ok(((r * len as f64).floor() as usize).min(len - 1))
}

fn clamp_index(n: f64, len: usize) -> usize {
    if n.is_nan() {
        return 0;
    }
    (n.max(0.0) as usize).min(len)
}
