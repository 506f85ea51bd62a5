use crate::error::{RuntimeError, SourceExtent};
use crate::types::JsValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Control-flow result of a statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Normal(JsValue),
    Break,
    Continue,
    Return(JsValue),
}

impl Completion {
    /// The carried value; break and continue carry `undefined`.
    pub fn value(&self) -> JsValue {
        match self {
            Completion::Normal(v) | Completion::Return(v) => v.clone(),
            Completion::Break | Completion::Continue => JsValue::Undefined,
        }
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }
}

/// A transient lvalue: (base object, property name). Produced by identifier
/// resolution and member access, consumed by GetValue/PutValue, `delete`,
/// `typeof` and call `this` determination. Never stored anywhere.
#[derive(Clone, Debug)]
pub struct Reference {
    pub base: Option<ObjectRef>,
    pub name: String,
}

/// What an expression evaluates to: a plain value, or a reference for the
/// few contexts that need an lvalue. Keeping the two apart (instead of a
/// reference variant on the value sum) lets the compiler enforce that
/// references never escape into the object graph.
#[derive(Clone, Debug)]
pub enum ExprValue {
    Value(JsValue),
    Ref(Reference),
}

impl From<JsValue> for ExprValue {
    fn from(v: JsValue) -> Self {
        ExprValue::Value(v)
    }
}

/// Property attribute set: {ReadOnly, DontEnum, DontDelete, Internal}.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyAttributes(u8);

impl PropertyAttributes {
    pub const NONE: Self = Self(0);
    pub const READ_ONLY: Self = Self(1);
    pub const DONT_ENUM: Self = Self(1 << 1);
    pub const DONT_DELETE: Self = Self(1 << 2);
    pub const INTERNAL: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PropertyAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Debug)]
pub struct Property {
    pub value: JsValue,
    pub attributes: PropertyAttributes,
}

/// A host function: the implementation behind a call or construct slot.
/// User functions are closures over their declaration (parameters, body,
/// captured scope chain); built-ins are plain Rust closures.
pub type NativeFn =
    Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, RuntimeError>>;

pub type ObjectRef = Rc<RefCell<JsObjectData>>;

/// The one object representation: a prototype-chained property map with an
/// internal value slot (wrapper objects) and optional call/construct slots
/// (functions). Activations and the global object are ordinary objects too.
pub struct JsObjectData {
    pub class_name: String,
    pub prototype: Option<ObjectRef>,
    properties: HashMap<String, Property>,
    property_order: Vec<String>,
    pub internal_value: JsValue,
    pub call: Option<NativeFn>,
    pub construct: Option<NativeFn>,
}

impl JsObjectData {
    pub fn new(class_name: &str, prototype: Option<ObjectRef>) -> Self {
        Self {
            class_name: class_name.to_string(),
            prototype,
            properties: HashMap::new(),
            property_order: Vec::new(),
            internal_value: JsValue::Undefined,
            call: None,
            construct: None,
        }
    }

    /// [[Get]]: own property first, then the prototype chain, else undefined.
    pub fn get(&self, name: &str) -> JsValue {
        if let Some(prop) = self.properties.get(name) {
            return prop.value.clone();
        }
        match &self.prototype {
            Some(proto) => proto.borrow().get(name),
            None => JsValue::Undefined,
        }
    }

    /// [[Put]]: writes the own property, creating it if absent. A write to a
    /// ReadOnly own property is a silent no-op.
    pub fn put(&mut self, name: &str, value: JsValue) {
        self.put_with_attributes(name, value, PropertyAttributes::NONE);
    }

    /// Like `put`; the attributes apply only when the property is created.
    pub fn put_with_attributes(
        &mut self,
        name: &str,
        value: JsValue,
        attributes: PropertyAttributes,
    ) {
        if let Some(prop) = self.properties.get_mut(name) {
            if prop.attributes.contains(PropertyAttributes::READ_ONLY) {
                return;
            }
            prop.value = value;
            return;
        }
        self.property_order.push(name.to_string());
        self.properties
            .insert(name.to_string(), Property { value, attributes });
    }

    /// Unconditional definition used when wiring built-ins: replaces both
    /// the value and the attributes, ignoring ReadOnly.
    pub fn define(&mut self, name: &str, value: JsValue, attributes: PropertyAttributes) {
        if !self.properties.contains_key(name) {
            self.property_order.push(name.to_string());
        }
        self.properties
            .insert(name.to_string(), Property { value, attributes });
    }

    /// [[HasProperty]]: same own-then-prototype order as `get`.
    pub fn has_property(&self, name: &str) -> bool {
        if self.properties.contains_key(name) {
            return true;
        }
        match &self.prototype {
            Some(proto) => proto.borrow().has_property(name),
            None => false,
        }
    }

    pub fn has_own_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// [[Delete]]: DontDelete properties survive (returns false); deleting
    /// an absent property reports success.
    pub fn delete(&mut self, name: &str) -> bool {
        match self.properties.get(name) {
            None => true,
            Some(prop) if prop.attributes.contains(PropertyAttributes::DONT_DELETE) => false,
            Some(_) => {
                self.properties.remove(name);
                self.property_order.retain(|k| k != name);
                true
            }
        }
    }

    pub fn own_attributes(&self, name: &str) -> Option<PropertyAttributes> {
        self.properties.get(name).map(|p| p.attributes)
    }

    /// Own property names in insertion order, skipping DontEnum entries.
    pub fn enumerable_own_keys(&self) -> Vec<String> {
        self.property_order
            .iter()
            .filter(|k| {
                self.properties
                    .get(*k)
                    .is_some_and(|p| !p.attributes.contains(PropertyAttributes::DONT_ENUM))
            })
            .cloned()
            .collect()
    }

    /// Strips everything that can participate in a cycle. Used by the
    /// teardown sweep; the object stays allocated as long as someone holds
    /// an Rc to it, but it no longer keeps anything else alive.
    pub(crate) fn clear_for_teardown(&mut self) {
        self.properties.clear();
        self.property_order.clear();
        self.prototype = None;
        self.internal_value = JsValue::Undefined;
        self.call = None;
        self.construct = None;
    }
}

impl fmt::Debug for JsObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObjectData")
            .field("class_name", &self.class_name)
            .field("properties", &self.property_order)
            .field("has_call", &self.call.is_some())
            .field("has_construct", &self.construct.is_some())
            .finish()
    }
}

/// One frame of the scope chain. The chain is a cons-list whose head is the
/// innermost activation and whose tail ends at the global object. `call_site`
/// is stamped around call dispatch and harvested into stack traces.
pub struct Scope {
    pub object: ObjectRef,
    pub parent: Option<ScopeRef>,
    pub call_site: RefCell<Option<SourceExtent>>,
}

pub type ScopeRef = Rc<Scope>;

impl Scope {
    pub fn new(object: ObjectRef, parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(Scope {
            object,
            parent,
            call_site: RefCell::new(None),
        })
    }

    /// Identifier resolution. The terminal (global) frame produces a
    /// reference even when the name is absent; that is what lets undeclared
    /// writes create globals and lets `typeof` see undefined identifiers.
    pub fn lookup(self: &Rc<Self>, name: &str) -> Reference {
        let mut current = self;
        loop {
            if current.parent.is_none() || current.object.borrow().has_property(name) {
                return Reference {
                    base: Some(current.object.clone()),
                    name: name.to_string(),
                };
            }
            current = current.parent.as_ref().expect("non-terminal frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsString;

    fn object(class: &str, proto: Option<ObjectRef>) -> ObjectRef {
        Rc::new(RefCell::new(JsObjectData::new(class, proto)))
    }

    #[test]
    fn attribute_set_operations() {
        let attrs = PropertyAttributes::READ_ONLY | PropertyAttributes::DONT_ENUM;
        assert!(attrs.contains(PropertyAttributes::READ_ONLY));
        assert!(attrs.contains(PropertyAttributes::DONT_ENUM));
        assert!(!attrs.contains(PropertyAttributes::DONT_DELETE));
        assert!(PropertyAttributes::NONE.contains(PropertyAttributes::NONE));
    }

    #[test]
    fn get_walks_the_prototype_chain() {
        let proto = object("Object", None);
        proto.borrow_mut().put("x", JsValue::Number(1.0));
        let obj = object("Object", Some(proto));
        assert_eq!(obj.borrow().get("x"), JsValue::Number(1.0));
        assert_eq!(obj.borrow().get("y"), JsValue::Undefined);
        assert!(obj.borrow().has_property("x"));
        assert!(!obj.borrow().has_own_property("x"));
    }

    #[test]
    fn own_property_shadows_prototype() {
        let proto = object("Object", None);
        proto.borrow_mut().put("x", JsValue::Number(1.0));
        let obj = object("Object", Some(proto));
        obj.borrow_mut().put("x", JsValue::Number(2.0));
        assert_eq!(obj.borrow().get("x"), JsValue::Number(2.0));
    }

    #[test]
    fn read_only_write_is_a_silent_no_op() {
        let obj = object("Object", None);
        obj.borrow_mut().put_with_attributes(
            "x",
            JsValue::Number(1.0),
            PropertyAttributes::READ_ONLY,
        );
        obj.borrow_mut().put("x", JsValue::Number(2.0));
        assert_eq!(obj.borrow().get("x"), JsValue::Number(1.0));
        assert!(
            obj.borrow()
                .own_attributes("x")
                .unwrap()
                .contains(PropertyAttributes::READ_ONLY)
        );
    }

    #[test]
    fn delete_respects_dont_delete() {
        let obj = object("Object", None);
        obj.borrow_mut().put("a", JsValue::Number(1.0));
        obj.borrow_mut().put_with_attributes(
            "b",
            JsValue::Number(2.0),
            PropertyAttributes::DONT_DELETE,
        );
        assert!(obj.borrow_mut().delete("a"));
        assert!(!obj.borrow_mut().delete("b"));
        assert!(obj.borrow_mut().delete("missing"));
        assert!(!obj.borrow().has_own_property("a"));
        assert!(obj.borrow().has_own_property("b"));
    }

    #[test]
    fn enumerable_keys_skip_dont_enum() {
        let obj = object("Object", None);
        obj.borrow_mut().put("a", JsValue::Number(1.0));
        obj.borrow_mut().put_with_attributes(
            "hidden",
            JsValue::Number(2.0),
            PropertyAttributes::DONT_ENUM,
        );
        obj.borrow_mut()
            .put("b", JsValue::String(JsString::from_str("s")));
        assert_eq!(obj.borrow().enumerable_own_keys(), vec!["a", "b"]);
    }

    #[test]
    fn scope_lookup_finds_innermost_binding() {
        let global = object("Global", None);
        global.borrow_mut().put("x", JsValue::Number(1.0));
        let activation = object("Activation", None);
        activation.borrow_mut().put("x", JsValue::Number(2.0));
        let chain = Scope::new(activation.clone(), Some(Scope::new(global, None)));
        let r = chain.lookup("x");
        assert!(Rc::ptr_eq(r.base.as_ref().unwrap(), &activation));
    }

    #[test]
    fn scope_lookup_terminal_frame_returns_reference_even_when_absent() {
        let global = object("Global", None);
        let activation = object("Activation", None);
        let chain = Scope::new(activation, Some(Scope::new(global.clone(), None)));
        let r = chain.lookup("missing");
        assert!(Rc::ptr_eq(r.base.as_ref().unwrap(), &global));
        assert_eq!(r.name, "missing");
    }

    #[test]
    fn completion_values() {
        assert_eq!(
            Completion::Normal(JsValue::Number(1.0)).value(),
            JsValue::Number(1.0)
        );
        assert_eq!(Completion::Break.value(), JsValue::Undefined);
        assert_eq!(Completion::Continue.value(), JsValue::Undefined);
        assert_eq!(
            Completion::Return(JsValue::Boolean(true)).value(),
            JsValue::Boolean(true)
        );
        assert!(Completion::Break.is_abrupt());
        assert!(!Completion::Normal(JsValue::Undefined).is_abrupt());
    }
}
