use super::*;
use crate::interpreter::{Interpreter, NativeFn, ObjectRef, to_boolean};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

/// The Boolean constructor and the shared Boolean.prototype, which is itself
/// a Boolean wrapper holding false.
pub(crate) fn install(interp: &mut Interpreter) -> ObjectRef {
    let proto = interp.boolean_prototype.clone();
    proto.borrow_mut().internal_value = JsValue::Boolean(false);

    // With `new`: a boxed Boolean carrying the converted primitive.
    let ctor = interp.make_native_function(1, |interp, _this, args| {
        let value = args.first().map(to_boolean).unwrap_or(false);
        Ok(JsValue::Object(interp.make_boolean_wrapper(value)))
    });
    // As a plain function: just ToBoolean.
    let call_fn: NativeFn = Rc::new(|_interp, _this, args| {
        Ok(JsValue::Boolean(args.first().map(to_boolean).unwrap_or(false)))
    });
    ctor.borrow_mut().call = Some(call_fn);
    ctor.borrow_mut().define(
        "prototype",
        JsValue::Object(proto.clone()),
        prototype_attributes(),
    );

    let to_string = interp.make_native_function(0, |_interp, this, _args| {
        let internal = wrapper_internal_value(this, "Boolean")?;
        let text = if matches!(internal, JsValue::Boolean(true)) {
            "true"
        } else {
            "false"
        };
        Ok(JsValue::String(JsString::from_str(text)))
    });
    let value_of = interp.make_native_function(0, |_interp, this, _args| {
        wrapper_internal_value(this, "Boolean")
    });

    {
        let mut p = proto.borrow_mut();
        p.put("constructor", JsValue::Object(ctor.clone()));
        p.put("toString", JsValue::Object(to_string));
        p.put("valueOf", JsValue::Object(value_of));
    }
    ctor
}
