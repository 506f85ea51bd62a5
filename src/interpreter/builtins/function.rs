use super::*;
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, NativeFn, ObjectRef};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

/// The Function constructor and Function.prototype members. The prototype
/// object itself is callable and returns undefined; building a function from
/// program text is not supported.
pub(crate) fn install(interp: &mut Interpreter) -> ObjectRef {
    let noop: NativeFn = Rc::new(|_interp, _this, _args| Ok(JsValue::Undefined));
    interp.function_prototype.borrow_mut().call = Some(noop);

    let ctor = interp.make_native_function(1, |_interp, _this, _args| {
        Err(RuntimeError::not_implemented("the Function constructor"))
    });
    ctor.borrow_mut().define(
        "prototype",
        JsValue::Object(interp.function_prototype.clone()),
        prototype_attributes(),
    );

    let to_string = interp.make_native_function(0, |_interp, this, _args| {
        let callable = this
            .as_object()
            .is_some_and(|o| o.borrow().call.is_some());
        if !callable {
            return Err(RuntimeError::type_error(
                "Function.prototype.toString requires a function",
            ));
        }
        Ok(JsValue::String(JsString::from_str(
            "function () { [native code] }",
        )))
    });

    {
        let mut p = interp.function_prototype.borrow_mut();
        p.put("constructor", JsValue::Object(ctor.clone()));
        p.put("toString", JsValue::Object(to_string));
    }
    ctor
}
