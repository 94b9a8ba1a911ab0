//! Native words. Each one works directly on the environment and returns the
//! signal the `Word` node should propagate; only the control words return
//! anything other than `Signal::Proceed`.
//!
//! Stack effects are written `before -- after` with the top of the stack on
//! the right.

use crate::ast::Signal;
use crate::environment::Environment;
use crate::error::{ErrorKind, ForthError, Result};
use crate::value::Value;

pub type Builtin = fn(&mut Environment) -> Result<Signal>;

/// Word text to native behaviour.
pub fn table() -> &'static [(&'static str, Builtin)] {
    TABLE
}

const TABLE: &[(&str, Builtin)] = &[
    ("dup", word_dup),
    ("drop", word_drop),
    ("swap", word_swap),
    ("over", word_over),
    ("rot", word_rot),
    ("pick", word_pick),
    ("roll", word_roll),
    ("nip", word_nip),
    ("tuck", word_tuck),
    ("+", word_add),
    ("-", word_subtract),
    ("*", word_multiply),
    ("/", word_divide),
    ("%", word_remainder),
    ("negate", word_negate),
    ("invert", word_invert),
    ("lshift", word_lshift),
    ("rshift", word_rshift),
    ("and", word_and),
    ("or", word_or),
    ("xor", word_xor),
    ("not", word_not),
    ("<", word_less),
    ("<=", word_less_equal),
    (">", word_greater),
    (">=", word_greater_equal),
    ("=", word_equal),
    ("s+", word_string_concat),
    ("s=", word_string_equal),
    ("!", word_store_cell),
    ("f!", word_store_float),
    ("c!", word_store_char),
    ("@", word_fetch_cell),
    ("f@", word_fetch_float),
    ("c@", word_fetch_char),
    ("cells", word_cells),
    ("floats", word_cells),
    ("chars", word_chars),
    ("tocell", word_to_cell),
    ("tofloat", word_to_float),
    ("input", word_input),
    ("finput", word_float_input),
    ("sinput", word_string_input),
    ("type", word_type),
    ("emit", word_emit),
    (".", word_print),
    (".s", word_print_stack),
    ("leave", word_leave),
    ("continue", word_continue),
    ("return", word_return),
    ("exit", word_return),
];

/// Signature: `a -- a a`
fn word_dup(env: &mut Environment) -> Result<Signal> {
    let a = env.pop()?;
    env.push(a);
    env.push(a);
    Ok(Signal::Proceed)
}

/// Signature: `a -- `
fn word_drop(env: &mut Environment) -> Result<Signal> {
    env.pop()?;
    Ok(Signal::Proceed)
}

/// Signature: `a b -- b a`
fn word_swap(env: &mut Environment) -> Result<Signal> {
    let b = env.pop()?;
    let a = env.pop()?;
    env.push(b);
    env.push(a);
    Ok(Signal::Proceed)
}

/// Signature: `a b -- a b a`
fn word_over(env: &mut Environment) -> Result<Signal> {
    let b = env.pop()?;
    let a = env.pop()?;
    env.push(a);
    env.push(b);
    env.push(a);
    Ok(Signal::Proceed)
}

/// Signature: `a b c -- b c a`
fn word_rot(env: &mut Environment) -> Result<Signal> {
    let c = env.pop()?;
    let b = env.pop()?;
    let a = env.pop()?;
    env.push(b);
    env.push(c);
    env.push(a);
    Ok(Signal::Proceed)
}

/// Copy the n-th element below the top (0 = top) onto the top.
///
/// Signature: `xn .. x0 n -- xn .. x0 xn`
fn word_pick(env: &mut Environment) -> Result<Signal> {
    let n = env.pop_int()?;
    let value = env.peek_at(n)?;
    env.push(value);
    Ok(Signal::Proceed)
}

/// Move the n-th element below the top onto the top.
///
/// Signature: `xn .. x0 n -- xn-1 .. x0 xn`
fn word_roll(env: &mut Environment) -> Result<Signal> {
    let n = env.pop_int()?;
    let value = env.remove_at(n)?;
    env.push(value);
    Ok(Signal::Proceed)
}

/// Signature: `a b -- b`
fn word_nip(env: &mut Environment) -> Result<Signal> {
    let b = env.pop()?;
    env.pop()?;
    env.push(b);
    Ok(Signal::Proceed)
}

/// Signature: `a b -- b a b`
fn word_tuck(env: &mut Environment) -> Result<Signal> {
    let b = env.pop()?;
    let a = env.pop()?;
    env.push(b);
    env.push(a);
    env.push(b);
    Ok(Signal::Proceed)
}

/// Pop `b` then `a`, push `op(a, b)`: the second-pushed operand is on the left.
fn binary(env: &mut Environment, op: impl FnOnce(Value, Value) -> Result<Value>) -> Result<Signal> {
    let b = env.pop()?;
    let a = env.pop()?;
    env.push(op(a, b)?);
    Ok(Signal::Proceed)
}

fn unary(env: &mut Environment, op: impl FnOnce(Value) -> Value) -> Result<Signal> {
    let a = env.pop()?;
    env.push(op(a));
    Ok(Signal::Proceed)
}

fn word_add(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.add(b)))
}

/// Signature: `a b -- a-b`
fn word_subtract(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.sub(b)))
}

fn word_multiply(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.mul(b)))
}

/// Signature: `a b -- a/b`
fn word_divide(env: &mut Environment) -> Result<Signal> {
    binary(env, Value::div)
}

/// Signature: `a b -- a%b`
fn word_remainder(env: &mut Environment) -> Result<Signal> {
    binary(env, Value::rem)
}

fn word_negate(env: &mut Environment) -> Result<Signal> {
    unary(env, Value::negate)
}

fn word_invert(env: &mut Environment) -> Result<Signal> {
    unary(env, Value::invert)
}

/// Signature: `a k -- a<<k`
fn word_lshift(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, k| Ok(a.shl(k)))
}

/// Arithmetic shift. Signature: `a k -- a>>k`
fn word_rshift(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, k| Ok(a.shr(k)))
}

fn word_and(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.bitand(b)))
}

fn word_or(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.bitor(b)))
}

fn word_xor(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.bitxor(b)))
}

fn word_not(env: &mut Environment) -> Result<Signal> {
    unary(env, Value::not)
}

fn word_less(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.less(b)))
}

fn word_less_equal(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.less_equal(b)))
}

fn word_greater(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.greater(b)))
}

fn word_greater_equal(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.greater_equal(b)))
}

fn word_equal(env: &mut Environment) -> Result<Signal> {
    binary(env, |a, b| Ok(a.equal(b)))
}

/// Pop a string as `(addr len)` and copy its bytes out of memory.
fn pop_string(env: &mut Environment) -> Result<Vec<u8>> {
    let len = env.pop_int()?;
    let address = env.pop_int()?;
    if len < 0 {
        return Err(ForthError::runtime(
            ErrorKind::InvalidAddress,
            format!("negative string length {}", len),
        ));
    }
    Ok(env.memory().read(address, len as usize)?.to_vec())
}

fn push_string(env: &mut Environment, bytes: &[u8]) -> Result<()> {
    let address = env.memory_mut().allocate_bytes(bytes)?;
    env.push(Value::Int(address));
    env.push(Value::Int(bytes.len() as i64));
    Ok(())
}

/// Concatenate into freshly allocated storage.
///
/// Signature: `addr1 len1 addr2 len2 -- addr len`
fn word_string_concat(env: &mut Environment) -> Result<Signal> {
    let second = pop_string(env)?;
    let mut first = pop_string(env)?;
    first.extend_from_slice(&second);
    push_string(env, &first)?;
    Ok(Signal::Proceed)
}

/// Signature: `addr1 len1 addr2 len2 -- flag`
fn word_string_equal(env: &mut Environment) -> Result<Signal> {
    let second = pop_string(env)?;
    let first = pop_string(env)?;
    env.push(Value::from_bool(first == second));
    Ok(Signal::Proceed)
}

/// Signature: `value addr -- `
fn word_store_cell(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.pop_int()?;
    env.memory_mut().write_cell(address, value)?;
    Ok(Signal::Proceed)
}

fn word_store_float(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.pop_float()?;
    env.memory_mut().write_float(address, value)?;
    Ok(Signal::Proceed)
}

/// Stores the low byte of the value.
fn word_store_char(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.pop_int()?;
    env.memory_mut().write_char(address, value as u8)?;
    Ok(Signal::Proceed)
}

/// Signature: `addr -- value`
fn word_fetch_cell(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.memory().read_cell(address)?;
    env.push(Value::Int(value));
    Ok(Signal::Proceed)
}

fn word_fetch_float(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.memory().read_float(address)?;
    env.push(Value::Float(value));
    Ok(Signal::Proceed)
}

fn word_fetch_char(env: &mut Environment) -> Result<Signal> {
    let address = env.pop_int()?;
    let value = env.memory().read_char(address)?;
    env.push(Value::Int(value as i64));
    Ok(Signal::Proceed)
}

/// Element count to byte count for cells and floats (8 bytes each).
fn word_cells(env: &mut Environment) -> Result<Signal> {
    let n = env.pop_int()?;
    env.push(Value::Int(n.wrapping_mul(8)));
    Ok(Signal::Proceed)
}

fn word_chars(env: &mut Environment) -> Result<Signal> {
    let n = env.pop_int()?;
    env.push(Value::Int(n));
    Ok(Signal::Proceed)
}

fn word_to_cell(env: &mut Environment) -> Result<Signal> {
    unary(env, |a| Value::Int(a.as_int()))
}

fn word_to_float(env: &mut Environment) -> Result<Signal> {
    unary(env, |a| Value::Float(a.as_float()))
}

fn invalid_input(token: &str, expected: &str) -> ForthError {
    ForthError::runtime(
        ErrorKind::InvalidInput,
        format!("cannot read '{}' as {}", token, expected),
    )
}

/// Signature: ` -- n`
fn word_input(env: &mut Environment) -> Result<Signal> {
    let token = env.read_token()?;
    let n = token
        .parse::<i64>()
        .map_err(|_| invalid_input(&token, "a cell"))?;
    env.push(Value::Int(n));
    Ok(Signal::Proceed)
}

/// Signature: ` -- f`
fn word_float_input(env: &mut Environment) -> Result<Signal> {
    let token = env.read_token()?;
    let f = token
        .parse::<f64>()
        .map_err(|_| invalid_input(&token, "a float"))?;
    env.push(Value::Float(f));
    Ok(Signal::Proceed)
}

/// Signature: ` -- addr len`
fn word_string_input(env: &mut Environment) -> Result<Signal> {
    let token = env.read_token()?;
    push_string(env, token.as_bytes())?;
    Ok(Signal::Proceed)
}

/// Signature: `addr len -- `
fn word_type(env: &mut Environment) -> Result<Signal> {
    let bytes = pop_string(env)?;
    env.write_output(&bytes)?;
    Ok(Signal::Proceed)
}

/// Signature: `c -- `
fn word_emit(env: &mut Environment) -> Result<Signal> {
    let c = env.pop_int()?;
    env.write_output(&[c as u8])?;
    Ok(Signal::Proceed)
}

/// Signature: `a -- `
fn word_print(env: &mut Environment) -> Result<Signal> {
    let a = env.pop()?;
    env.write_output(format!("{} ", a).as_bytes())?;
    Ok(Signal::Proceed)
}

/// Print the whole stack bottom to top followed by its depth; the stack is
/// left untouched.
fn word_print_stack(env: &mut Environment) -> Result<Signal> {
    let mut line = String::new();
    for value in env.stack() {
        line.push_str(&format!("{} ", value));
    }
    line.push_str(&format!("<{}>\n", env.stack().len()));
    env.write_output(line.as_bytes())?;
    Ok(Signal::Proceed)
}

fn word_leave(_env: &mut Environment) -> Result<Signal> {
    Ok(Signal::BreakLoop)
}

fn word_continue(_env: &mut Environment) -> Result<Signal> {
    Ok(Signal::ContinueLoop)
}

fn word_return(_env: &mut Environment) -> Result<Signal> {
    Ok(Signal::ReturnFromFunction)
}
