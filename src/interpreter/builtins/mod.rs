use super::*;
use crate::error::RuntimeError;
use crate::types::JsValue;

mod boolean;
mod function;
mod number;
mod object;

/// Attributes of the `prototype` property on built-in constructors.
pub(crate) fn prototype_attributes() -> PropertyAttributes {
    PropertyAttributes::READ_ONLY | PropertyAttributes::DONT_ENUM | PropertyAttributes::DONT_DELETE
}

/// Reads the internal value of a wrapper receiver, raising the error the
/// wrapper prototypes use when invoked on the wrong class of object.
pub(crate) fn wrapper_internal_value(
    this: &JsValue,
    expected_class: &str,
) -> Result<JsValue, RuntimeError> {
    if let Some(obj) = this.as_object() {
        let o = obj.borrow();
        if o.class_name == expected_class {
            return Ok(o.internal_value.clone());
        }
    }
    Err(RuntimeError::type_error(format!(
        "{this} is not a {expected_class}"
    )))
}

impl Interpreter {
    /// Populate the global object. Everything here is DontEnum, as the
    /// original global is.
    pub(crate) fn setup_globals(&mut self) {
        let attr = PropertyAttributes::DONT_ENUM;

        let object_ctor = object::install(self);
        let function_ctor = function::install(self);
        let boolean_ctor = boolean::install(self);
        let number_ctor = number::install(self);

        let eval_fn = self.make_native_function(1, |interp, _this, args| {
            // Non-strings pass through untouched; strings parse fresh and
            // run in the caller's scope chain. The result is the last normal
            // completion's value; any abrupt completion yields undefined.
            let Some(first) = args.first() else {
                return Ok(JsValue::Undefined);
            };
            let JsValue::String(source) = first else {
                return Ok(first.clone());
            };
            let program = crate::parser::parse(&source.to_rust_string(), "eval")?;
            let mut result = JsValue::Undefined;
            for s in &program.body {
                match interp.exec_statement(s)? {
                    Completion::Normal(v) => result = v,
                    _ => return Ok(JsValue::Undefined),
                }
            }
            Ok(result)
        });

        let is_nan = self.make_native_function(1, |interp, _this, args| {
            let n = interp.to_number(args.first().unwrap_or(&JsValue::Undefined))?;
            Ok(JsValue::Boolean(n.is_nan()))
        });

        let is_finite = self.make_native_function(1, |interp, _this, args| {
            let n = interp.to_number(args.first().unwrap_or(&JsValue::Undefined))?;
            Ok(JsValue::Boolean(n.is_finite()))
        });

        let alert = self.make_native_function(1, |interp, _this, args| {
            match args.first() {
                Some(v) => {
                    let text = interp.to_string_value(v)?;
                    println!("ALERT: {text}");
                }
                None => println!("ALERT"),
            }
            Ok(JsValue::Undefined)
        });

        let global = self.global().clone();
        let mut g = global.borrow_mut();
        g.put_with_attributes("Object", JsValue::Object(object_ctor), attr);
        g.put_with_attributes("Function", JsValue::Object(function_ctor), attr);
        g.put_with_attributes("Boolean", JsValue::Object(boolean_ctor), attr);
        g.put_with_attributes("Number", JsValue::Object(number_ctor), attr);
        g.put_with_attributes("NaN", JsValue::Number(f64::NAN), attr);
        g.put_with_attributes("Infinity", JsValue::Number(f64::INFINITY), attr);
        g.put_with_attributes("eval", JsValue::Object(eval_fn), attr);
        g.put_with_attributes("isNaN", JsValue::Object(is_nan), attr);
        g.put_with_attributes("isFinite", JsValue::Object(is_finite), attr);
        g.put_with_attributes("alert", JsValue::Object(alert), attr);
    }
}
