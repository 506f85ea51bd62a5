use crate::ast::{FunctionDecl, Program, Statement};
use crate::error::{RuntimeError, SourceExtent};
use crate::types::JsValue;
use log::trace;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

mod types;
pub use types::*;

mod helpers;
pub(crate) use helpers::*;

mod builtins;
mod eval;
mod exec;
mod gc;

pub type TraceHook = Box<dyn FnMut(&Statement, &Completion)>;

/// The tree-walking evaluator. Owns the global object and the built-ins,
/// tracks the current scope chain, and registers every allocated object for
/// the teardown sweep.
pub struct Interpreter {
    global: ObjectRef,
    scopes: ScopeRef,
    object_prototype: ObjectRef,
    function_prototype: ObjectRef,
    boolean_prototype: ObjectRef,
    number_prototype: ObjectRef,
    heap: Vec<Weak<RefCell<JsObjectData>>>,
    heap_compact_at: usize,
    on_statement: Option<TraceHook>,
}

impl Interpreter {
    /// Build the global environment and hoist the program's top-level names.
    pub fn new(program: &Program) -> Self {
        Self::build(program, None)
    }

    /// Like `new`, with a hook that fires after every executed statement
    /// (REPL tracing).
    pub fn with_trace(
        program: &Program,
        hook: impl FnMut(&Statement, &Completion) + 'static,
    ) -> Self {
        Self::build(program, Some(Box::new(hook)))
    }

    fn build(program: &Program, on_statement: Option<TraceHook>) -> Self {
        let raw = |class: &str, proto: Option<ObjectRef>| {
            Rc::new(RefCell::new(JsObjectData::new(class, proto)))
        };
        let global = raw("Global", None);
        let object_prototype = raw("ObjectPrototype", None);
        let function_prototype = raw("Function", Some(object_prototype.clone()));
        let boolean_prototype = raw("Boolean", Some(object_prototype.clone()));
        let number_prototype = raw("Number", Some(object_prototype.clone()));
        let scopes = Scope::new(global.clone(), None);

        let mut interp = Self {
            global: global.clone(),
            scopes,
            object_prototype: object_prototype.clone(),
            function_prototype: function_prototype.clone(),
            boolean_prototype: boolean_prototype.clone(),
            number_prototype: number_prototype.clone(),
            heap: Vec::new(),
            heap_compact_at: gc::HEAP_COMPACTION_THRESHOLD,
            on_statement,
        };
        for obj in [
            &global,
            &object_prototype,
            &function_prototype,
            &boolean_prototype,
            &number_prototype,
        ] {
            interp.register_object(obj);
        }
        interp.setup_globals();
        interp.hoist_program(program);
        interp
    }

    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// Pre-bind a program's top-level `var` and function names into the
    /// global object. Construction does this for the initial program; a REPL
    /// calls it again for each new input. Names that already exist keep
    /// their values (redeclaration does not reset).
    pub fn hoist_program(&mut self, program: &Program) {
        let mut g = self.global.borrow_mut();
        for name in exec::hoisted_names(&program.body) {
            if !g.has_own_property(&name) {
                g.put(&name, JsValue::Undefined);
            }
        }
    }

    /// Run all statements; the result is the last statement's completion
    /// value.
    pub fn run(&mut self, program: &Program) -> Result<JsValue, RuntimeError> {
        let mut last = JsValue::Undefined;
        for s in &program.body {
            last = self.eval_statement(s)?.value();
        }
        Ok(last)
    }

    pub fn eval_statement(&mut self, s: &Statement) -> Result<Completion, RuntimeError> {
        self.exec_statement(s)
    }

    /// Evaluate an expression to a plain value; references are resolved
    /// before anything leaves the evaluator.
    pub fn eval_expression(
        &mut self,
        e: &crate::ast::Expression,
    ) -> Result<JsValue, RuntimeError> {
        let v = self.eval_expr(e)?;
        self.get_value(&v)
    }

    pub(crate) fn alloc_object(
        &mut self,
        class_name: &str,
        prototype: Option<ObjectRef>,
    ) -> ObjectRef {
        let obj = Rc::new(RefCell::new(JsObjectData::new(class_name, prototype)));
        self.register_object(&obj);
        obj
    }

    /// A built-in function object: class "Function", Function.prototype in
    /// its chain, ReadOnly length, and the same implementation on both the
    /// call and construct slots (wrapper constructors override one of them).
    pub(crate) fn make_native_function(
        &mut self,
        arity: u32,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, RuntimeError>
        + 'static,
    ) -> ObjectRef {
        let func: NativeFn = Rc::new(f);
        let obj = self.alloc_object("Function", Some(self.function_prototype.clone()));
        {
            let mut o = obj.borrow_mut();
            o.put_with_attributes(
                "length",
                JsValue::Number(f64::from(arity)),
                PropertyAttributes::READ_ONLY
                    | PropertyAttributes::DONT_DELETE
                    | PropertyAttributes::DONT_ENUM,
            );
            o.put(
                "prototype",
                JsValue::Object(self.function_prototype.clone()),
            );
            o.call = Some(func.clone());
            o.construct = Some(func);
        }
        obj
    }

    pub(crate) fn make_boolean_wrapper(&mut self, value: bool) -> ObjectRef {
        let obj = self.alloc_object("Boolean", Some(self.boolean_prototype.clone()));
        obj.borrow_mut().internal_value = JsValue::Boolean(value);
        obj
    }

    pub(crate) fn make_number_wrapper(&mut self, value: f64) -> ObjectRef {
        let obj = self.alloc_object("Number", Some(self.number_prototype.clone()));
        obj.borrow_mut().internal_value = JsValue::Number(value);
        obj
    }

    /// A function declaration's object. The call slot closes over the
    /// declaration, the scope chain at declaration time, the hoisted-name
    /// list, and the function object itself (for `arguments.callee`).
    pub(crate) fn make_user_function(&mut self, decl: &Rc<FunctionDecl>) -> JsValue {
        let callee = self.alloc_object("Function", Some(self.function_prototype.clone()));
        let hoisted: Rc<[String]> = exec::hoisted_names(&decl.body).into();

        let call_decl = decl.clone();
        let call_scope = self.scopes.clone();
        let call_callee = callee.clone();
        let call_fn: NativeFn = Rc::new(move |interp, this, args| {
            interp.invoke_user_function(&call_decl, &call_scope, &hoisted, &call_callee, this, args)
        });

        let construct_callee = callee.clone();
        let instance_class = decl.name.clone();
        let construct_fn: NativeFn = Rc::new(move |interp, _this, args| {
            // The instance inherits from the function's prototype property
            // when that is an object, else from Object.prototype; an object
            // returned by the body wins over the fresh instance.
            let proto = match construct_callee.borrow().get("prototype") {
                JsValue::Object(p) => p,
                _ => interp.object_prototype.clone(),
            };
            let instance = interp.alloc_object(&instance_class, Some(proto));
            let this = JsValue::Object(instance.clone());
            let call = construct_callee
                .borrow()
                .call
                .clone()
                .expect("user function has a call slot");
            let result = call(interp, &this, args)?;
            Ok(match result {
                JsValue::Object(_) => result,
                _ => this,
            })
        });

        {
            let mut c = callee.borrow_mut();
            c.put_with_attributes(
                "length",
                JsValue::Number(decl.params.len() as f64),
                PropertyAttributes::READ_ONLY
                    | PropertyAttributes::DONT_DELETE
                    | PropertyAttributes::DONT_ENUM,
            );
            c.call = Some(call_fn);
            c.construct = Some(construct_fn);
        }

        let proto = self.alloc_object("Object", Some(self.object_prototype.clone()));
        proto.borrow_mut().put_with_attributes(
            "constructor",
            JsValue::Object(callee.clone()),
            PropertyAttributes::DONT_ENUM,
        );
        callee
            .borrow_mut()
            .put("prototype", JsValue::Object(proto));
        JsValue::Object(callee)
    }

    fn invoke_user_function(
        &mut self,
        decl: &FunctionDecl,
        captured: &ScopeRef,
        hoisted: &[String],
        callee: &ObjectRef,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, RuntimeError> {
        trace!("enter {}({} args)", decl.name, args.len());
        let activation = self.alloc_object("Activation", None);
        let arguments = self.make_arguments_object(args, callee);
        {
            let mut act = activation.borrow_mut();
            act.put_with_attributes(
                "this",
                this.clone(),
                PropertyAttributes::READ_ONLY
                    | PropertyAttributes::DONT_ENUM
                    | PropertyAttributes::DONT_DELETE,
            );
            act.put_with_attributes(
                "arguments",
                JsValue::Object(arguments),
                PropertyAttributes::DONT_DELETE,
            );
            for (i, param) in decl.params.iter().enumerate() {
                act.put(param, args.get(i).cloned().unwrap_or(JsValue::Undefined));
            }
            // A var that shares a parameter's name keeps the argument value.
            for name in hoisted {
                if !act.has_own_property(name) {
                    act.put(name, JsValue::Undefined);
                }
            }
        }

        let saved = std::mem::replace(
            &mut self.scopes,
            Scope::new(activation, Some(captured.clone())),
        );
        let result = self.exec_statements(&decl.body);
        self.scopes = saved;
        Ok(result?.value())
    }

    /// The `arguments` object: callee, length and one indexed property per
    /// argument, all DontEnum.
    fn make_arguments_object(&mut self, args: &[JsValue], callee: &ObjectRef) -> ObjectRef {
        let obj = self.alloc_object("Object", Some(self.object_prototype.clone()));
        {
            let mut o = obj.borrow_mut();
            o.put_with_attributes(
                "callee",
                JsValue::Object(callee.clone()),
                PropertyAttributes::DONT_ENUM,
            );
            o.put_with_attributes(
                "length",
                JsValue::Number(args.len() as f64),
                PropertyAttributes::DONT_ENUM,
            );
            for (i, arg) in args.iter().enumerate() {
                o.put_with_attributes(&i.to_string(), arg.clone(), PropertyAttributes::DONT_ENUM);
            }
        }
        obj
    }

    /// The current extent plus every call site stamped into the active
    /// scope chain, innermost first.
    pub(crate) fn stack_trace(&self, current: &SourceExtent) -> Vec<SourceExtent> {
        let mut frames = vec![current.clone()];
        let mut scope = Some(&self.scopes);
        while let Some(s) = scope {
            if let Some(site) = s.call_site.borrow().as_ref() {
                frames.push(site.clone());
            }
            scope = s.parent.as_ref();
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::JsString;

    fn run_source(src: &str) -> Result<JsValue, RuntimeError> {
        let program = parse(src, "test").expect("parse failure");
        let mut interp = Interpreter::new(&program);
        interp.run(&program)
    }

    fn eval_to(src: &str) -> JsValue {
        run_source(src).unwrap_or_else(|e| panic!("{src}: {}", e.render()))
    }

    #[track_caller]
    fn expect_number(src: &str, expected: f64) {
        match eval_to(src) {
            JsValue::Number(n) => {
                assert!(
                    crate::types::number_ops::equal(n, expected) || (n.is_nan() && expected.is_nan()),
                    "{src}: expected {expected}, got {n}"
                );
            }
            other => panic!("{src}: expected number, got {other:?}"),
        }
    }

    #[track_caller]
    fn expect_string(src: &str, expected: &str) {
        assert_eq!(
            eval_to(src),
            JsValue::String(JsString::from_str(expected)),
            "{src}"
        );
    }

    #[track_caller]
    fn expect_bool(src: &str, expected: bool) {
        assert_eq!(eval_to(src), JsValue::Boolean(expected), "{src}");
    }

    #[track_caller]
    fn expect_undefined(src: &str) {
        assert_eq!(eval_to(src), JsValue::Undefined, "{src}");
    }

    #[track_caller]
    fn expect_error(src: &str, message_part: &str) {
        match run_source(src) {
            Err(e) => assert!(
                e.message.contains(message_part),
                "{src}: expected error containing {message_part:?}, got {:?}",
                e.message
            ),
            Ok(v) => panic!("{src}: expected an error, got {v:?}"),
        }
    }

    #[test]
    fn literals() {
        expect_undefined("undefined");
        assert_eq!(eval_to("null"), JsValue::Null);
        expect_bool("true", true);
        expect_bool("false", false);
        expect_number("42", 42.0);
        expect_string("'te\"st'", "te\"st");
        expect_string("\"te'st\"", "te'st");
    }

    #[test]
    fn arithmetic() {
        expect_number("1+2*3", 7.0);
        expect_number("-7.5 % 2", -1.5);
        expect_number("y=1/2; y", 0.5);
        expect_number("1/0", f64::INFINITY);
        expect_number("0/0", f64::NAN);
        expect_number("2*3-4", 2.0);
    }

    #[test]
    fn string_concatenation() {
        expect_string("x = 42; 'test ' + 2 * (6 - 4 + 1) + ' ' + x", "test 6 42");
        expect_string("y=1/2; z='string'; y+z", "0.5string");
        expect_string("1 + '2'", "12");
    }

    #[test]
    fn increment_and_decrement() {
        expect_number("var x=2; x++;", 2.0);
        expect_number("var x=2; x++; x", 3.0);
        expect_number("var x=2; x--;", 2.0);
        expect_number("var x=2; x--; x", 1.0);
        expect_number("x=4.5; ++x", 5.5);
        expect_number("x=4.5; --x", 3.5);
    }

    #[test]
    fn unary_operators() {
        expect_undefined("void(2+2)");
        expect_number("x=42; +x;", 42.0);
        expect_number("x=42; -x;", -42.0);
        expect_bool("x=42; !x;", false);
        expect_number("x=42; ~x;", -43.0);
        expect_number("+true", 1.0);
        expect_number("+'0x10'", 16.0);
    }

    #[test]
    fn shifts_and_bitwise() {
        expect_number("1<<2", 4.0);
        expect_number("-5>>2", -2.0);
        expect_number("-5>>>2", 1073741822.0);
        expect_number("255 & 128", 128.0);
        expect_number("255 ^ 128", 127.0);
        expect_number("64 | 128", 192.0);
        expect_number("~~2.9", 2.0);
        expect_number("~~-2.9", -2.0);
    }

    #[test]
    fn relational_and_equality() {
        expect_bool("1 < 2", true);
        expect_bool("1 > 2", false);
        expect_bool("1 <= 2", true);
        expect_bool("1 >= 2", false);
        expect_bool("1 == 2", false);
        expect_bool("1 != 2", true);
        expect_bool("1 == '1'", true);
        expect_bool("null == undefined", true);
    }

    #[test]
    fn nan_comparisons_are_all_false() {
        expect_bool("var u = 0/0; u < 1", false);
        expect_bool("var u = 0/0; u <= 1", false);
        expect_bool("var u = 0/0; u > 1", false);
        expect_bool("var u = 0/0; u >= 1", false);
        expect_bool("var u = 0/0; u == u", false);
        expect_bool("var u = 0/0; u != u", true);
    }

    #[test]
    fn string_relational_is_lexicographic() {
        expect_bool("'abc' < 'abd'", true);
        expect_bool("'a' < 'ab'", true);
        expect_bool("'b' <= 'a'", false);
        expect_bool("'b' > 'a'", true);
    }

    #[test]
    fn logical_operators_return_operands() {
        expect_number("42 || 13", 42.0);
        expect_number("42 && 13", 13.0);
        expect_number("0 || 13", 13.0);
        expect_number("0 && 13", 0.0);
        expect_bool("!!('')", false);
        expect_bool("!!('0' && Object(null))", true);
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        expect_number("var n = 0; function bump(){ n = n + 1; return true; } false && bump(); n", 0.0);
        expect_number("var n = 0; function bump(){ n = n + 1; return true; } true || bump(); n", 0.0);
        expect_number("var n = 0; function bump(){ n = n + 1; return true; } true && bump(); n", 1.0);
    }

    #[test]
    fn conditional_evaluates_one_branch() {
        expect_number("1 ? 2 : 3", 2.0);
        expect_number("0 ? 2 : 1+2", 3.0);
        expect_number("var n = 0; function bump(){ n = n + 1; return n; } 1 ? 2 : bump(); n", 0.0);
    }

    #[test]
    fn comma_and_compound_assignment() {
        expect_number("1,2", 2.0);
        expect_number("x=2.5; x+=4; x", 6.5);
        expect_number("x=8; x>>=2; x", 2.0);
        expect_number("x=5; x%=3; x", 2.0);
    }

    #[test]
    fn coercion_oddities() {
        expect_bool("'' == false", true);
        expect_bool("false == ''", true);
        expect_bool("null == false", false);
        expect_number("true + true", 2.0);
    }

    #[test]
    fn statements_and_control_flow() {
        expect_undefined(";");
        expect_number("if (1) 2;", 2.0);
        expect_undefined("if (0) 2;");
        expect_undefined("if (0) 2; else ;");
        expect_number("if (0) 2; else 3;", 3.0);
        expect_number("x=5; while(x-3) { x = x - 1; } x", 3.0);
    }

    #[test]
    fn while_with_continue_and_break() {
        expect_number(
            "x=2; y=0; while(1) { if(x) {x = x - 1; y = y + 2; continue; y = y + 1000; } else break; y = y + 1;} y",
            4.0,
        );
    }

    #[test]
    fn for_loops() {
        expect_number(
            "var x = 0; for(var i = 10, dec = 1; i; i = i - dec) x = x + i; x",
            55.0,
        );
        expect_number("var x=0; for (i=2; i; i=i-1) x=x+i; x+i", 3.0);
        expect_number("var x=0; for (;;) { x = x + 1; if (x == 3) break; } x", 3.0);
    }

    #[test]
    fn functions_and_calls() {
        expect_number("function f(x,y) { return x*x+y; } f(2, 3)", 7.0);
        expect_undefined("function f() {} f()");
        expect_number("function f(a, b) { return a; } f(1)", 1.0);
        expect_undefined("function f(a, b) { return b; } f(1)");
    }

    #[test]
    fn undeclared_assignment_creates_a_global() {
        expect_number("function f(){ i = 42; }; f(); i", 42.0);
    }

    #[test]
    fn local_var_shadows_global() {
        expect_number("i = 1; function f(){ var i = 42; }; f(); i", 1.0);
    }

    #[test]
    fn hoisting_makes_names_visible_before_their_declaration() {
        expect_string("var t = typeof x; var x = 5; t", "undefined");
        expect_number("var t = x; var x = 5; t == undefined ? 1 : 2", 1.0);
        // Function bindings are installed when the declaration executes.
        expect_string("function f(){} typeof f", "function");
    }

    #[test]
    fn var_with_parameter_name_keeps_the_argument() {
        expect_number("function f(a) { var a; return a; } f(7)", 7.0);
    }

    #[test]
    fn arguments_object() {
        expect_number(
            "function sum() { var s = 0; for (var i = 0; i < arguments.length; ++i) s += arguments[i]; return s; } sum(1,2,3)",
            6.0,
        );
        expect_number("function f() { return arguments.length; } f(1, 2)", 2.0);
        expect_number(
            "function fact(n){ return n <= 1 ? 1 : n * arguments.callee(n-1); } fact(5)",
            120.0,
        );
        // arguments is DontDelete.
        expect_string("function f(){ delete arguments; return typeof arguments; } f()", "object");
    }

    #[test]
    fn closures_capture_their_activation() {
        expect_number(
            "function counter() { var n = 0; function inc() { n = n + 1; return n; } return inc; } var c = counter(); c(); c()",
            2.0,
        );
        // Two invocations get distinct activations.
        expect_number(
            "function counter() { var n = 0; function inc() { n = n + 1; return n; } return inc; } var a = counter(); var b = counter(); a(); a(); b()",
            1.0,
        );
    }

    #[test]
    fn function_length_is_read_only() {
        expect_number("function f(a,b){} f.length", 2.0);
        expect_number("function f(a){} f.length = 5; f.length", 1.0);
    }

    #[test]
    fn this_is_read_only_in_the_activation() {
        expect_number("function f(){ this = 5; return 42; } f()", 42.0);
    }

    #[test]
    fn delete_of_var_and_property() {
        expect_undefined("var x = 42; delete x; x");
        expect_string("o = new Object; o.x = 1; delete o.x; typeof o.x", "undefined");
        expect_bool("o = new Object; delete o.missing", true);
        expect_bool("delete 42", true);
    }

    #[test]
    fn typeof_tags() {
        expect_string("typeof(2)", "number");
        expect_string("typeof 'x'", "string");
        expect_string("typeof true", "boolean");
        expect_string("typeof undefined", "undefined");
        expect_string("typeof null", "object");
        expect_string("typeof new Object", "object");
        expect_string("typeof Object", "function");
        expect_string("typeof not_declared_anywhere", "undefined");
    }

    #[test]
    fn object_builtin() {
        expect_string("''+Object(null)", "[object Object]");
        expect_number("o=Object(null); o.x=42; o.y=60; o.x+o['y']", 102.0);
        expect_number("a=Object(null);b=Object(null);a.x=b;a.x.y=42;a['x']['y']", 42.0);
        expect_string("'' + new Object", "[object Object]");
        expect_string("'' + new Object()", "[object Object]");
        expect_string("'' + new Object(null)", "[object Object]");
        expect_string("'' + new Object(undefined)", "[object Object]");
        expect_number("o = new Object; o.x = 42; new Object(o).x", 42.0);
    }

    #[test]
    fn boolean_builtin() {
        expect_bool("Boolean()", false);
        expect_bool("Boolean(true)", true);
        expect_bool("Boolean(42)", true);
        expect_bool("Boolean(0)", false);
        expect_bool("Boolean('')", false);
        expect_bool("Boolean('x')", true);
        expect_number("0 + new Boolean()", 0.0);
        expect_number("0 + new Boolean(1)", 1.0);
        expect_string("'' + new Boolean(0)", "false");
        expect_string("'' + new Boolean(1)", "true");
    }

    #[test]
    fn number_builtin() {
        expect_number("Number()", 0.0);
        expect_number("Number(42.42)", 42.42);
        expect_number("Number('0.5')", 0.5);
        expect_number("Number.MIN_VALUE", 5e-324);
        expect_number("Number.MAX_VALUE", f64::MAX);
        expect_number("Number.POSITIVE_INFINITY", f64::INFINITY);
        expect_number("Number.NEGATIVE_INFINITY", f64::NEG_INFINITY);
        expect_bool("Number.NaN == Number.NaN", false);
        expect_string("new Number(42.42).toString()", "42.42");
        expect_string("''+new Number(60)", "60");
        expect_number("new Number(17).valueOf()", 17.0);
    }

    #[test]
    fn number_to_string_with_radix() {
        expect_string("new Number(255).toString(16)", "ff");
        expect_string("new Number(8).toString(2)", "1000");
        expect_string("new Number(42).toString(10)", "42");
        expect_error("new Number(1).toString(1)", "RangeError");
        expect_error("new Number(1).toString(37)", "RangeError");
    }

    #[test]
    fn wrapper_methods_type_check_their_receiver() {
        expect_error("o = new Object; o.toString = new Boolean(1).toString; o.toString()", "TypeError");
        expect_error("o = new Object; o.valueOf = new Number(5).valueOf; o.valueOf()", "TypeError");
    }

    #[test]
    fn constructed_instances() {
        expect_number("function Point(x){ this.x = x; } var p = new Point(3); p.x", 3.0);
        expect_string("function Point(x){ this.x = x; } '' + new Point(1)", "[object Point]");
        expect_bool("function Point(){} var p = new Point; p.constructor == Point", true);
        expect_number("function A(){}; A.prototype.greet = 42; var a = new A; a.greet", 42.0);
        expect_string("function F(){}; F.prototype = 5; '' + new F", "[object F]");
        // A returned object wins over the fresh instance.
        expect_string("function F(){ return new Object; } '' + new F", "[object Object]");
        expect_number("function F(){ return 7; } var o = new F; typeof o == 'object' ? 1 : 2", 1.0);
    }

    #[test]
    fn global_functions() {
        expect_bool("isNaN(0/0)", true);
        expect_bool("isNaN(1)", false);
        expect_bool("isNaN()", true);
        expect_bool("isFinite(42)", true);
        expect_bool("isFinite(1/0)", false);
        expect_bool("isNaN(NaN)", true);
        expect_number("Infinity", f64::INFINITY);
    }

    #[test]
    fn eval_runs_in_the_callers_scope() {
        expect_number("eval('1+2')", 3.0);
        expect_number("var x = 1; eval('x = 42'); x", 42.0);
        expect_number("eval(42)", 42.0);
        expect_undefined("eval()");
        expect_number("function f(){ var loc = 7; return eval('loc'); } f()", 7.0);
        expect_number("function f(){ eval('var y = 5'); return y; } f()", 5.0);
        expect_undefined("eval('var q = 1; while (0) {}')");
    }

    #[test]
    fn eval_of_bad_source_is_a_syntax_error() {
        expect_error("eval('1 +')", "SyntaxError");
    }

    #[test]
    fn with_statement_is_not_implemented() {
        expect_error("o = new Object; with (o) { x; }", "not implemented");
    }

    #[test]
    fn call_errors() {
        expect_error("does_not_exist()", "is not a function");
        expect_error("o = new Object; o()", "is not callable");
        expect_error("null.x", "TypeError");
        expect_error("undefined_thing.x", "TypeError");
        expect_error("new 5", "is not an object");
        expect_error("o = new Object; new o", "is not constructable");
    }

    #[test]
    fn runtime_errors_carry_a_stack_trace() {
        let err = run_source("function f(){ return null.x; } f()").unwrap_err();
        assert!(!err.stack.is_empty());
        assert_eq!(err.stack[0].file.as_ref(), "test");

        // Errors raised outside any call have no frames.
        let err = run_source("null.x").unwrap_err();
        assert!(err.stack.is_empty());
    }

    #[test]
    fn references_never_escape() {
        // A reference produced by a member expression is resolved before it
        // is stored or returned anywhere user-visible.
        expect_number("o = new Object; o.x = 1; var y = o.x; o.x = 2; y", 1.0);
        expect_number("function id(v) { return v; } o = new Object; o.x = 3; id(o.x)", 3.0);
    }

    #[test]
    fn trace_hook_fires_per_statement() {
        let program = parse("var x = 1; x + 1; if (x) x = 2;", "test").unwrap();
        let counter = Rc::new(RefCell::new(0));
        let seen = counter.clone();
        let mut interp = Interpreter::with_trace(&program, move |_s, _c| {
            *seen.borrow_mut() += 1;
        });
        interp.run(&program).unwrap();
        // Three top-level statements plus the nested assignment.
        assert_eq!(*counter.borrow(), 4);
    }

    #[test]
    fn driver_surface_evaluates_single_statements() {
        let program = parse("var x = 41; x + 1;", "test").unwrap();
        let mut interp = Interpreter::new(&program);
        let first = interp.eval_statement(&program.body[0]).unwrap();
        assert_eq!(first, Completion::Normal(JsValue::Undefined));
        let Statement::Expression(e) = &program.body[1] else {
            panic!("expected expression statement");
        };
        assert_eq!(interp.eval_expression(e).unwrap(), JsValue::Number(42.0));
        let second = interp.eval_statement(&program.body[1]).unwrap();
        assert_eq!(second, Completion::Normal(JsValue::Number(42.0)));
    }

    #[test]
    fn teardown_sweep_breaks_cycles() {
        let program = parse("o = new Object; o.self = o; o", "test").unwrap();
        let mut interp = Interpreter::new(&program);
        let result = interp.run(&program).unwrap();
        let JsValue::Object(obj) = result else {
            panic!("expected an object result");
        };
        assert!(obj.borrow().has_own_property("self"));
        assert!(interp.live_objects() > 0);
        drop(interp);
        // The sweep stripped the cycle; the object we still hold is empty.
        assert!(!obj.borrow().has_own_property("self"));
        assert!(obj.borrow().prototype.is_none());
    }
}
