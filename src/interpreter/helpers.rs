use super::*;
use crate::error::RuntimeError;
use crate::types::{JsString, JsValue, number_ops};

/// ToBoolean. Total; no object hook is involved.
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

/// ToNumber of a string, per the string numeric grammar: optional
/// whitespace, optional sign, decimal or hex literal; empty is zero and
/// anything malformed is NaN.
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let text = s.to_rust_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        return hex
            .chars()
            .fold(0.0, |acc, c| acc * 16.0 + f64::from(c.to_digit(16).unwrap()));
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust's float grammar is wider than the language's: it accepts "inf",
    // "infinity" and "nan" in any case. Those must all read as NaN here.
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned.eq_ignore_ascii_case("inf")
        || unsigned.eq_ignore_ascii_case("infinity")
        || unsigned.eq_ignore_ascii_case("nan")
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToNumber of an already-primitive value.
pub(crate) fn to_number_primitive(val: &JsValue) -> f64 {
    match val {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => f64::from(*b),
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Object(_) => unreachable!("objects go through ToPrimitive first"),
    }
}

/// ToString of an already-primitive value.
pub(crate) fn to_string_primitive(val: &JsValue) -> JsString {
    match val {
        JsValue::Undefined => JsString::from_str("undefined"),
        JsValue::Null => JsString::from_str("null"),
        JsValue::Boolean(true) => JsString::from_str("true"),
        JsValue::Boolean(false) => JsString::from_str("false"),
        JsValue::Number(n) => JsString::from_str(&number_ops::to_string(*n)),
        JsValue::String(s) => s.clone(),
        JsValue::Object(_) => unreachable!("objects go through ToPrimitive first"),
    }
}

/// Relational comparison on numbers: -1 for undefined (a NaN operand),
/// 0 for false, 1 for true. The infinity checks keep the result exact
/// without relying on how `<` orders infinities against finite values.
pub(crate) fn tri_compare(l: f64, r: f64) -> i32 {
    if l.is_nan() || r.is_nan() {
        return -1;
    }
    if l == r {
        return 0;
    }
    if l == f64::INFINITY {
        0
    } else if r == f64::INFINITY {
        1
    } else if r == f64::NEG_INFINITY {
        0
    } else if l == f64::NEG_INFINITY {
        1
    } else {
        i32::from(l < r)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PrimitiveHint {
    Number,
    String,
}

impl Interpreter {
    /// ToPrimitive: objects defer to their DefaultValue (valueOf then
    /// toString, reversed under the string hint); primitives pass through.
    pub(crate) fn to_primitive(
        &mut self,
        val: &JsValue,
        hint: Option<PrimitiveHint>,
    ) -> Result<JsValue, RuntimeError> {
        let JsValue::Object(obj) = val else {
            return Ok(val.clone());
        };
        let method_order = match hint {
            Some(PrimitiveHint::String) => ["toString", "valueOf"],
            _ => ["valueOf", "toString"],
        };
        for name in method_order {
            let method = obj.borrow().get(name);
            let Some(method_obj) = method.as_object() else {
                continue;
            };
            let Some(call) = method_obj.borrow().call.clone() else {
                continue;
            };
            let result = call(self, val, &[])?;
            if !matches!(result, JsValue::Object(_)) {
                return Ok(result);
            }
        }
        Err(RuntimeError::type_error(format!(
            "Cannot convert {} object to primitive value",
            obj.borrow().class_name
        )))
    }

    pub(crate) fn to_number(&mut self, val: &JsValue) -> Result<f64, RuntimeError> {
        match val {
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Some(PrimitiveHint::Number))?;
                Ok(to_number_primitive(&prim))
            }
            _ => Ok(to_number_primitive(val)),
        }
    }

    pub(crate) fn to_string_value(&mut self, val: &JsValue) -> Result<JsString, RuntimeError> {
        match val {
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Some(PrimitiveHint::String))?;
                Ok(to_string_primitive(&prim))
            }
            _ => Ok(to_string_primitive(val)),
        }
    }

    pub(crate) fn to_int32(&mut self, val: &JsValue) -> Result<i32, RuntimeError> {
        Ok(number_ops::to_int32(self.to_number(val)?))
    }

    pub(crate) fn to_uint32(&mut self, val: &JsValue) -> Result<u32, RuntimeError> {
        Ok(number_ops::to_uint32(self.to_number(val)?))
    }

    /// ToObject. Booleans and numbers box into wrapper objects; null and
    /// undefined are type errors. Strings would need the String built-in,
    /// which this dialect does not have.
    pub(crate) fn to_object(&mut self, val: &JsValue) -> Result<ObjectRef, RuntimeError> {
        match val {
            JsValue::Object(o) => Ok(o.clone()),
            JsValue::Boolean(b) => Ok(self.make_boolean_wrapper(*b)),
            JsValue::Number(n) => Ok(self.make_number_wrapper(*n)),
            JsValue::String(_) => Err(RuntimeError::not_implemented(
                "converting a string to an object",
            )),
            JsValue::Undefined | JsValue::Null => Err(RuntimeError::type_error(format!(
                "Cannot convert {} to object",
                val.type_name()
            ))),
        }
    }

    /// The `==` relation. Matching types compare directly; otherwise the
    /// operands coerce toward numbers, with objects going through
    /// ToPrimitive.
    pub(crate) fn compare_equal(
        &mut self,
        l: &JsValue,
        r: &JsValue,
    ) -> Result<bool, RuntimeError> {
        match (l, r) {
            (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => Ok(true),
            (JsValue::Number(a), JsValue::Number(b)) => Ok(number_ops::equal(*a, *b)),
            (JsValue::String(a), JsValue::String(b)) => Ok(a == b),
            (JsValue::Boolean(a), JsValue::Boolean(b)) => Ok(a == b),
            (JsValue::Object(a), JsValue::Object(b)) => Ok(std::rc::Rc::ptr_eq(a, b)),
            (JsValue::Null, JsValue::Undefined) | (JsValue::Undefined, JsValue::Null) => Ok(true),
            (JsValue::Number(_), JsValue::String(s)) => {
                let coerced = JsValue::Number(string_to_number(s));
                self.compare_equal(l, &coerced)
            }
            (JsValue::String(s), JsValue::Number(_)) => {
                let coerced = JsValue::Number(string_to_number(s));
                self.compare_equal(&coerced, r)
            }
            (JsValue::Boolean(b), _) => {
                let coerced = JsValue::Number(f64::from(*b));
                self.compare_equal(&coerced, r)
            }
            (_, JsValue::Boolean(b)) => {
                let coerced = JsValue::Number(f64::from(*b));
                self.compare_equal(l, &coerced)
            }
            (JsValue::String(_) | JsValue::Number(_), JsValue::Object(_)) => {
                let prim = self.to_primitive(r, None)?;
                self.compare_equal(l, &prim)
            }
            (JsValue::Object(_), JsValue::String(_) | JsValue::Number(_)) => {
                let prim = self.to_primitive(l, None)?;
                self.compare_equal(&prim, r)
            }
            _ => Ok(false),
        }
    }
}
