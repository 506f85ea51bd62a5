use super::*;
use crate::ast::*;
use crate::error::{RuntimeError, SourceExtent};
use crate::types::{JsString, JsValue, number_ops};
use log::trace;

fn eval_literal(lit: &Literal) -> JsValue {
    match lit {
        Literal::Undefined => JsValue::Undefined,
        Literal::Null => JsValue::Null,
        Literal::Boolean(b) => JsValue::Boolean(*b),
        Literal::Number(n) => JsValue::Number(*n),
        Literal::String(s) => JsValue::String(JsString::from_str(s)),
    }
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, e: &Expression) -> Result<ExprValue, RuntimeError> {
        match &e.kind {
            ExprKind::Identifier(name) => Ok(ExprValue::Ref(self.scopes.lookup(name))),
            ExprKind::Literal(lit) => Ok(ExprValue::Value(eval_literal(lit))),
            ExprKind::Call(member, args) => self.eval_call(member, args, &e.extent),
            ExprKind::Prefix(op, operand) => self.eval_prefix(*op, operand, &e.extent),
            ExprKind::Postfix(op, operand) => self.eval_postfix(*op, operand),
            ExprKind::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs),
            ExprKind::Conditional(cond, then_e, else_e) => {
                let test = self.eval_expr(cond)?;
                let branch = if to_boolean(&self.get_value(&test)?) {
                    then_e
                } else {
                    else_e
                };
                let chosen = self.eval_expr(branch)?;
                Ok(ExprValue::Value(self.get_value(&chosen)?))
            }
        }
    }

    /// GetValue: dereference a reference (or pass a value through). Reading
    /// through a reference with no base is the "not defined" error; a
    /// present base that lacks the property reads as undefined.
    pub(crate) fn get_value(&self, v: &ExprValue) -> Result<JsValue, RuntimeError> {
        match v {
            ExprValue::Value(val) => Ok(val.clone()),
            ExprValue::Ref(Reference {
                base: Some(base),
                name,
            }) => Ok(base.borrow().get(name)),
            ExprValue::Ref(Reference { base: None, name }) => {
                Err(RuntimeError::reference_error(format!("{name} is not defined")))
            }
        }
    }

    /// PutValue: store through a reference, creating the property on the
    /// base when absent (on the global object for undeclared names).
    pub(crate) fn put_value(
        &mut self,
        target: &ExprValue,
        value: JsValue,
    ) -> Result<(), RuntimeError> {
        match target {
            ExprValue::Ref(Reference {
                base: Some(base),
                name,
            }) => {
                base.borrow_mut().put(name, value);
                Ok(())
            }
            ExprValue::Ref(Reference { base: None, name }) => Err(
                RuntimeError::reference_error(format!("Cannot assign to {name}")),
            ),
            ExprValue::Value(_) => Err(RuntimeError::reference_error(
                "Invalid assignment target",
            )),
        }
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> Result<Vec<JsValue>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.eval_expr(arg)?;
            values.push(self.get_value(&v)?);
        }
        Ok(values)
    }

    fn eval_call(
        &mut self,
        member_expr: &Expression,
        args: &[Expression],
        extent: &SourceExtent,
    ) -> Result<ExprValue, RuntimeError> {
        let member = self.eval_expr(member_expr)?;
        let mval = self.get_value(&member)?;
        let args = self.eval_arguments(args)?;

        let Some(target) = mval.as_object() else {
            return Err(RuntimeError::type_error(format!(
                "{member_expr} is not a function"
            ))
            .with_stack(self.stack_trace(extent)));
        };
        let Some(func) = target.borrow().call.clone() else {
            return Err(RuntimeError::type_error(format!(
                "{member_expr} is not callable"
            ))
            .with_stack(self.stack_trace(extent)));
        };

        // An activation base never becomes `this`; plain function calls get
        // null (which built-ins treat as "no receiver").
        let this = match &member {
            ExprValue::Ref(Reference {
                base: Some(base), ..
            }) if base.borrow().class_name != "Activation" => JsValue::Object(base.clone()),
            _ => JsValue::Null,
        };

        trace!("call {member_expr} ({} args)", args.len());
        self.invoke(func, &this, &args, extent).map(ExprValue::Value)
    }

    fn eval_new(
        &mut self,
        target: &Expression,
        extent: &SourceExtent,
    ) -> Result<ExprValue, RuntimeError> {
        // `new X(args)` parses with the call folded into the operand; unwrap
        // it so the argument list goes to the construct slot.
        let (ctor_expr, args) = match &target.kind {
            ExprKind::Call(member, args) => (member.as_ref(), self.eval_arguments(args)?),
            _ => (target, Vec::new()),
        };
        let ctor = self.eval_expr(ctor_expr)?;
        let cval = self.get_value(&ctor)?;

        let Some(obj) = cval.as_object() else {
            return Err(
                RuntimeError::type_error(format!("{ctor_expr} is not an object"))
                    .with_stack(self.stack_trace(extent)),
            );
        };
        let Some(construct) = obj.borrow().construct.clone() else {
            return Err(
                RuntimeError::type_error(format!("{ctor_expr} is not constructable"))
                    .with_stack(self.stack_trace(extent)),
            );
        };

        trace!("new {ctor_expr} ({} args)", args.len());
        self.invoke(construct, &JsValue::Undefined, &args, extent)
            .map(ExprValue::Value)
    }

    /// Dispatch through a call or construct slot with the call site stamped
    /// into the active scope, so errors raised below can collect a trace.
    pub(crate) fn invoke(
        &mut self,
        func: NativeFn,
        this: &JsValue,
        args: &[JsValue],
        extent: &SourceExtent,
    ) -> Result<JsValue, RuntimeError> {
        self.scopes.call_site.replace(Some(extent.clone()));
        let result = func(self, this, args);
        self.scopes.call_site.replace(None);
        result.map_err(|e| {
            if e.stack.is_empty() {
                e.with_stack(self.stack_trace(extent))
            } else {
                e
            }
        })
    }

    fn eval_prefix(
        &mut self,
        op: PrefixOp,
        operand: &Expression,
        extent: &SourceExtent,
    ) -> Result<ExprValue, RuntimeError> {
        if op == PrefixOp::New {
            return self.eval_new(operand, extent);
        }

        let u = self.eval_expr(operand)?;
        let result = match op {
            PrefixOp::Delete => match &u {
                ExprValue::Ref(Reference { base: None, .. }) => JsValue::Boolean(true),
                ExprValue::Ref(Reference {
                    base: Some(base),
                    name,
                }) => JsValue::Boolean(base.borrow_mut().delete(name)),
                // `delete 42` has nothing to remove.
                ExprValue::Value(_) => JsValue::Boolean(true),
            },
            PrefixOp::Void => {
                self.get_value(&u)?;
                JsValue::Undefined
            }
            PrefixOp::TypeOf => {
                if let ExprValue::Ref(Reference { base: None, .. }) = &u {
                    return Ok(ExprValue::Value(JsValue::String(JsString::from_str(
                        "undefined",
                    ))));
                }
                let v = self.get_value(&u)?;
                let tag = match &v {
                    JsValue::Undefined => "undefined",
                    JsValue::Null => "object",
                    JsValue::Boolean(_) => "boolean",
                    JsValue::Number(_) => "number",
                    JsValue::String(_) => "string",
                    JsValue::Object(o) => {
                        if o.borrow().call.is_some() {
                            "function"
                        } else {
                            "object"
                        }
                    }
                };
                JsValue::String(JsString::from_str(tag))
            }
            PrefixOp::Increment | PrefixOp::Decrement => {
                let delta = if op == PrefixOp::Increment { 1.0 } else { -1.0 };
                let old = self.get_value(&u)?;
                let num = self.to_number(&old)? + delta;
                self.put_value(&u, JsValue::Number(num))?;
                JsValue::Number(num)
            }
            PrefixOp::Plus => {
                let v = self.get_value(&u)?;
                JsValue::Number(self.to_number(&v)?)
            }
            PrefixOp::Minus => {
                let v = self.get_value(&u)?;
                JsValue::Number(-self.to_number(&v)?)
            }
            PrefixOp::BitNot => {
                let v = self.get_value(&u)?;
                JsValue::Number(f64::from(!self.to_int32(&v)?))
            }
            PrefixOp::Not => {
                let v = self.get_value(&u)?;
                JsValue::Boolean(!to_boolean(&v))
            }
            PrefixOp::New => unreachable!("handled above"),
        };
        Ok(ExprValue::Value(result))
    }

    fn eval_postfix(
        &mut self,
        op: PostfixOp,
        operand: &Expression,
    ) -> Result<ExprValue, RuntimeError> {
        let u = self.eval_expr(operand)?;
        let old = self.get_value(&u)?;
        let orig = self.to_number(&old)?;
        let num = match op {
            PostfixOp::Increment => orig + 1.0,
            PostfixOp::Decrement => orig - 1.0,
        };
        self.put_value(&u, JsValue::Number(num))?;
        Ok(ExprValue::Value(JsValue::Number(orig)))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<ExprValue, RuntimeError> {
        if op == BinaryOp::Comma {
            let l = self.eval_expr(lhs)?;
            self.get_value(&l)?;
            let r = self.eval_expr(rhs)?;
            return Ok(ExprValue::Value(self.get_value(&r)?));
        }

        if op.is_assignment() {
            let target = self.eval_expr(lhs)?;
            let rv = self.eval_expr(rhs)?;
            let mut result = self.get_value(&rv)?;
            if op != BinaryOp::Assign {
                let lval = self.get_value(&target)?;
                result = self.binary_operation(op.without_assignment(), lval, result)?;
            }
            self.put_value(&target, result.clone())?;
            return Ok(ExprValue::Value(result));
        }

        let lv = self.eval_expr(lhs)?;
        let l = self.get_value(&lv)?;
        // Short-circuit: the left operand itself is the result, uncoerced.
        if (op == BinaryOp::And && !to_boolean(&l)) || (op == BinaryOp::Or && to_boolean(&l)) {
            return Ok(ExprValue::Value(l));
        }
        let rv = self.eval_expr(rhs)?;
        let r = self.get_value(&rv)?;
        if op == BinaryOp::And || op == BinaryOp::Or {
            return Ok(ExprValue::Value(r));
        }

        if op == BinaryOp::Member || op == BinaryOp::Index {
            let base = self.to_object(&l)?;
            let name = self.to_string_value(&r)?.to_rust_string();
            return Ok(ExprValue::Ref(Reference {
                base: Some(base),
                name,
            }));
        }

        self.binary_operation(op, l, r).map(ExprValue::Value)
    }

    /// The operator table for plain (non-lvalue, non-short-circuit) binary
    /// operators, shared with compound assignment.
    pub(crate) fn binary_operation(
        &mut self,
        op: BinaryOp,
        l: JsValue,
        r: JsValue,
    ) -> Result<JsValue, RuntimeError> {
        if op == BinaryOp::Add {
            let l = self.to_primitive(&l, None)?;
            let r = self.to_primitive(&r, None)?;
            if l.is_string() || r.is_string() {
                let ls = to_string_primitive(&l);
                let rs = to_string_primitive(&r);
                return Ok(JsValue::String(ls.concat(&rs)));
            }
            return Ok(JsValue::Number(
                to_number_primitive(&l) + to_number_primitive(&r),
            ));
        }

        if op.is_relational() {
            let l = self.to_primitive(&l, Some(PrimitiveHint::Number))?;
            let r = self.to_primitive(&r, Some(PrimitiveHint::Number))?;
            if let (JsValue::String(ls), JsValue::String(rs)) = (&l, &r) {
                let result = match op {
                    BinaryOp::Less => ls < rs,
                    BinaryOp::LessEq => ls <= rs,
                    BinaryOp::Greater => ls > rs,
                    BinaryOp::GreaterEq => ls >= rs,
                    _ => unreachable!(),
                };
                return Ok(JsValue::Boolean(result));
            }
            let ln = to_number_primitive(&l);
            let rn = to_number_primitive(&r);
            // The argument swaps route NaN through the "undefined" result so
            // that, say, `x <= y` is false (not true) when either is NaN.
            let result = match op {
                BinaryOp::Less => tri_compare(ln, rn) == 1,
                BinaryOp::LessEq => !matches!(tri_compare(rn, ln), -1 | 1),
                BinaryOp::Greater => tri_compare(rn, ln) == 1,
                BinaryOp::GreaterEq => !matches!(tri_compare(ln, rn), -1 | 1),
                _ => unreachable!(),
            };
            return Ok(JsValue::Boolean(result));
        }

        if op == BinaryOp::Eq || op == BinaryOp::NotEq {
            let eq = self.compare_equal(&l, &r)?;
            return Ok(JsValue::Boolean(if op == BinaryOp::Eq { eq } else { !eq }));
        }

        let ln = self.to_number(&l)?;
        let rn = self.to_number(&r)?;
        let result = match op {
            BinaryOp::Sub => ln - rn,
            BinaryOp::Mul => ln * rn,
            BinaryOp::Div => ln / rn,
            BinaryOp::Rem => ln % rn,
            BinaryOp::LeftShift => {
                f64::from(number_ops::to_int32(ln).wrapping_shl(number_ops::to_uint32(rn) & 0x1f))
            }
            BinaryOp::RightShift => {
                f64::from(number_ops::to_int32(ln).wrapping_shr(number_ops::to_uint32(rn) & 0x1f))
            }
            BinaryOp::UnsignedRightShift => {
                f64::from(number_ops::to_uint32(ln).wrapping_shr(number_ops::to_uint32(rn) & 0x1f))
            }
            BinaryOp::BitAnd => f64::from(number_ops::to_int32(ln) & number_ops::to_int32(rn)),
            BinaryOp::BitXor => f64::from(number_ops::to_int32(ln) ^ number_ops::to_int32(rn)),
            BinaryOp::BitOr => f64::from(number_ops::to_int32(ln) | number_ops::to_int32(rn)),
            other => unreachable!("{other:?} is handled before the numeric table"),
        };
        Ok(JsValue::Number(result))
    }
}
