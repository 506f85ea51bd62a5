use super::*;
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, NativeFn, ObjectRef, to_number_primitive};
use crate::types::{JsString, JsValue, number_ops};
use std::rc::Rc;

/// The Number constructor (with its value statics) and the shared
/// Number.prototype, itself a Number wrapper holding +0.
pub(crate) fn install(interp: &mut Interpreter) -> ObjectRef {
    let proto = interp.number_prototype.clone();
    proto.borrow_mut().internal_value = JsValue::Number(0.0);

    // With `new`: a boxed Number carrying the converted primitive.
    let ctor = interp.make_native_function(1, |interp, _this, args| {
        let value = match args.first() {
            Some(v) => interp.to_number(v)?,
            None => 0.0,
        };
        Ok(JsValue::Object(interp.make_number_wrapper(value)))
    });
    // As a plain function: just ToNumber.
    let call_fn: NativeFn = Rc::new(|interp, _this, args| {
        let value = match args.first() {
            Some(v) => interp.to_number(v)?,
            None => 0.0,
        };
        Ok(JsValue::Number(value))
    });
    ctor.borrow_mut().call = Some(call_fn);

    {
        let mut c = ctor.borrow_mut();
        c.define(
            "prototype",
            JsValue::Object(proto.clone()),
            prototype_attributes(),
        );
        c.put("MAX_VALUE", JsValue::Number(f64::MAX));
        c.put("MIN_VALUE", JsValue::Number(5e-324));
        c.put("NaN", JsValue::Number(f64::NAN));
        c.put("NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY));
        c.put("POSITIVE_INFINITY", JsValue::Number(f64::INFINITY));
    }

    let to_string = interp.make_native_function(1, |interp, this, args| {
        let internal = wrapper_internal_value(this, "Number")?;
        let n = to_number_primitive(&internal);
        let radix = match args.first() {
            None | Some(JsValue::Undefined) => 10,
            Some(v) => interp.to_int32(v)?,
        };
        if !(2..=36).contains(&radix) {
            return Err(RuntimeError::range_error(format!(
                "Invalid radix in Number.prototype.toString: {radix}"
            )));
        }
        let text = if radix == 10 || !n.is_finite() || n.trunc() != n || n.abs() >= 9e15 {
            number_ops::to_string(n)
        } else {
            number_ops::format_radix(n as i64, radix as u32)
        };
        Ok(JsValue::String(JsString::from_str(&text)))
    });
    let value_of = interp.make_native_function(0, |_interp, this, _args| {
        wrapper_internal_value(this, "Number")
    });

    {
        let mut p = proto.borrow_mut();
        p.put("constructor", JsValue::Object(ctor.clone()));
        p.put("toString", JsValue::Object(to_string));
        p.put("valueOf", JsValue::Object(value_of));
    }
    ctor
}
