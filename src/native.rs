//! Host interop. A host exposes one of its objects to scripts by implementing
//! [`NativeObject`] and binding a [`NativeHandle`] to it in the root environment.
//! Scripts can then read `obj.prop` paths and write them with `set obj.prop = value`.

use rust_decimal::Decimal;
use std::{
    cell::RefCell,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use crate::{
    error::{Error, Result},
    runtime::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    /// The object has no property with that name.
    NotFound,
    /// The property exists but does not accept the offered value.
    Rejected,
}

pub trait NativeObject {
    fn type_name(&self) -> &str;

    fn get_property(&self, name: &str) -> Option<HostValue>;

    fn set_property(&mut self, name: &str, value: &Value) -> std::result::Result<(), PropertyError>;
}

/// A property value as the host reports it, before it is wrapped as a script value.
#[derive(Debug, Clone)]
pub enum HostValue {
    Text(String),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    Decimal(Decimal),
    Bool(bool),
    Object(NativeHandle),
    /// Any host type scripts cannot see, named for diagnostics.
    Opaque(String),
}

impl TryFrom<HostValue> for Value {
    type Error = Error;

    fn try_from(value: HostValue) -> Result<Value> {
        Ok(match value {
            HostValue::Text(s) => Value::String(s),
            HostValue::I32(n) => Value::Number(Decimal::from(n)),
            HostValue::I64(n) => Value::Number(Decimal::from(n)),
            HostValue::U32(n) => Value::Number(Decimal::from(n)),
            HostValue::U64(n) => Value::Number(Decimal::from(n)),
            HostValue::Decimal(n) => Value::Number(n),
            HostValue::Bool(b) => Value::Boolean(b),
            HostValue::Object(handle) => Value::NativeObject(handle),
            HostValue::Opaque(type_name) => return Err(Error::Conversion(type_name)),
        })
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Text(s)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::I32(n)
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        HostValue::I64(n)
    }
}

impl From<u32> for HostValue {
    fn from(n: u32) -> Self {
        HostValue::U32(n)
    }
}

impl From<u64> for HostValue {
    fn from(n: u64) -> Self {
        HostValue::U64(n)
    }
}

impl From<Decimal> for HostValue {
    fn from(n: Decimal) -> Self {
        HostValue::Decimal(n)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<NativeHandle> for HostValue {
    fn from(handle: NativeHandle) -> Self {
        HostValue::Object(handle)
    }
}

/// Shared reference to a host object. Two handles are equal only if they point at the
/// same object.
#[derive(Clone)]
pub struct NativeHandle(Rc<RefCell<dyn NativeObject>>);

impl NativeHandle {
    pub fn new<T: NativeObject + 'static>(object: T) -> Self {
        NativeHandle(Rc::new(RefCell::new(object)))
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name().to_string()
    }

    pub fn get_property(&self, name: &str) -> Option<HostValue> {
        self.0.borrow().get_property(name)
    }

    pub fn set_property(
        &self,
        name: &str,
        value: &Value,
    ) -> std::result::Result<(), PropertyError> {
        self.0.borrow_mut().set_property(name, value)
    }

    pub fn ptr_eq(&self, other: &NativeHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for NativeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for NativeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<object:{}>", self.type_name())
    }
}
