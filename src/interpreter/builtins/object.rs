use super::*;
use crate::interpreter::{Interpreter, ObjectRef};
use crate::types::{JsString, JsValue};

/// The Object constructor and Object.prototype members.
pub(crate) fn install(interp: &mut Interpreter) -> ObjectRef {
    // Called as a function or with `new`: null/undefined/missing make a
    // fresh plain object, anything else converts via ToObject (so an object
    // argument comes back unchanged).
    let ctor = interp.make_native_function(1, |interp, _this, args| {
        match args.first() {
            None | Some(JsValue::Undefined) | Some(JsValue::Null) => {
                let proto = interp.object_prototype.clone();
                Ok(JsValue::Object(interp.alloc_object("Object", Some(proto))))
            }
            Some(v) => Ok(JsValue::Object(interp.to_object(v)?)),
        }
    });
    let proto = interp.object_prototype.clone();
    ctor.borrow_mut().define(
        "prototype",
        JsValue::Object(proto.clone()),
        prototype_attributes(),
    );

    let to_string = interp.make_native_function(0, |_interp, this, _args| {
        let Some(obj) = this.as_object() else {
            return Err(crate::error::RuntimeError::type_error(
                "Object.prototype.toString requires an object",
            ));
        };
        let text = format!("[object {}]", obj.borrow().class_name);
        Ok(JsValue::String(JsString::from_str(&text)))
    });
    let value_of = interp.make_native_function(0, |_interp, this, _args| Ok(this.clone()));

    {
        let mut p = proto.borrow_mut();
        p.put("constructor", JsValue::Object(ctor.clone()));
        p.put("toString", JsValue::Object(to_string));
        p.put("valueOf", JsValue::Object(value_of));
    }
    ctor
}
