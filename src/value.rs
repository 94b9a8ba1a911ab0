use crate::error::{ErrorKind, ForthError, Result};
use std::fmt;

/// The only thing that ever lives on the operand stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn from_bool(b: bool) -> Self {
        Value::Int(b as i64)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
        }
    }

    /// Integer view of the value; floats truncate toward zero.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(n) => *n as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(n) => *n,
        }
    }

    pub fn add(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_add(r)),
            (l, r) => Value::Float(l.as_float() + r.as_float()),
        }
    }

    pub fn sub(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_sub(r)),
            (l, r) => Value::Float(l.as_float() - r.as_float()),
        }
    }

    pub fn mul(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_mul(r)),
            (l, r) => Value::Float(l.as_float() * r.as_float()),
        }
    }

    /// Integer division truncates; any float operand promotes the whole
    /// operation to float division, where dividing by zero yields inf/NaN.
    pub fn div(self, rhs: Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(division_by_zero("/")),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_div(r))),
            (l, r) => Ok(Value::Float(l.as_float() / r.as_float())),
        }
    }

    pub fn rem(self, rhs: Value) -> Result<Value> {
        let (l, r) = (self.as_int(), rhs.as_int());
        if r == 0 {
            return Err(division_by_zero("%"));
        }
        Ok(Value::Int(l.wrapping_rem(r)))
    }

    pub fn bitand(self, rhs: Value) -> Value {
        Value::Int(self.as_int() & rhs.as_int())
    }

    pub fn bitor(self, rhs: Value) -> Value {
        Value::Int(self.as_int() | rhs.as_int())
    }

    pub fn bitxor(self, rhs: Value) -> Value {
        Value::Int(self.as_int() ^ rhs.as_int())
    }

    pub fn shl(self, amount: Value) -> Value {
        Value::Int(self.as_int().wrapping_shl(amount.as_int() as u32))
    }

    pub fn shr(self, amount: Value) -> Value {
        Value::Int(self.as_int().wrapping_shr(amount.as_int() as u32))
    }

    pub fn negate(self) -> Value {
        match self {
            Value::Int(n) => Value::Int(n.wrapping_neg()),
            Value::Float(n) => Value::Float(-n),
        }
    }

    pub fn invert(self) -> Value {
        Value::Int(!self.as_int())
    }

    pub fn not(self) -> Value {
        Value::from_bool(!self.is_truthy())
    }

    pub fn less(self, rhs: Value) -> Value {
        Value::from_bool(match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => l < r,
            (l, r) => l.as_float() < r.as_float(),
        })
    }

    pub fn less_equal(self, rhs: Value) -> Value {
        Value::from_bool(match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => l <= r,
            (l, r) => l.as_float() <= r.as_float(),
        })
    }

    pub fn greater(self, rhs: Value) -> Value {
        rhs.less(self)
    }

    pub fn greater_equal(self, rhs: Value) -> Value {
        rhs.less_equal(self)
    }

    pub fn equal(self, rhs: Value) -> Value {
        Value::from_bool(match (self, rhs) {
            (Value::Int(l), Value::Int(r)) => l == r,
            (l, r) => l.as_float() == r.as_float(),
        })
    }
}

fn division_by_zero(word: &str) -> ForthError {
    ForthError::runtime(
        ErrorKind::DivisionByZero,
        format!("integer division by zero in '{}'", word),
    )
    .with_help("Convert an operand with 'tofloat' to get IEEE infinity instead.")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                // Always show at least one decimal place for floats
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}
