use core::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::info::{TypeInfo, Typed};
use crate::{FromReflect, Reflect};

// -----------------------------------------------------------------------------
// AccessFault

/// A failed accessor call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccessFault {
    #[error("accessor `{method}` expects a `{expected}` receiver, found `{found}`")]
    Receiver {
        method: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("accessor `{method}` expects a `{expected}` value, found `{found}`")]
    Value {
        method: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("accessor `{method}` is a {actual}")]
    WrongKind {
        method: &'static str,
        actual: MethodKind,
    },
    #[error("accessor `{method}` panicked: {message}")]
    Panicked {
        method: &'static str,
        message: String,
    },
}

// -----------------------------------------------------------------------------
// MethodInfo

/// Whether a method reads or writes a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Getter,
    Setter,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Getter => f.write_str("getter"),
            MethodKind::Setter => f.write_str("setter"),
        }
    }
}

type GetterFn = Box<dyn Fn(&dyn Reflect) -> Result<Box<dyn Reflect>, AccessFault> + Send + Sync>;
type SetterFn = Box<dyn Fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), AccessFault> + Send + Sync>;

enum Call {
    Get(GetterFn),
    Set(SetterFn),
}

/// A type-erased accessor method.
///
/// Built by `#[reflect(getters(..), setters(..))]` from ordinary inherent
/// methods `fn(&self) -> T` and `fn(&mut self, T)`. A panic inside the
/// method is caught and surfaces as [`AccessFault::Panicked`].
pub struct MethodInfo {
    name: &'static str,
    kind: MethodKind,
    value_type: fn() -> &'static TypeInfo,
    call: Call,
}

fn panic_message(payload: Box<dyn core::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        String::from(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

impl MethodInfo {
    pub fn getter<S: Reflect, T: Reflect + Typed>(name: &'static str, f: fn(&S) -> T) -> Self {
        let call = move |target: &dyn Reflect| -> Result<Box<dyn Reflect>, AccessFault> {
            let Some(receiver) = target.downcast_ref::<S>() else {
                return Err(AccessFault::Receiver {
                    method: name,
                    expected: core::any::type_name::<S>(),
                    found: target.reflect_type_path(),
                });
            };
            match panic::catch_unwind(AssertUnwindSafe(|| f(receiver))) {
                Ok(value) => Ok(Box::new(value) as Box<dyn Reflect>),
                Err(payload) => Err(AccessFault::Panicked {
                    method: name,
                    message: panic_message(payload),
                }),
            }
        };
        Self {
            name,
            kind: MethodKind::Getter,
            value_type: T::type_info,
            call: Call::Get(Box::new(call)),
        }
    }

    pub fn setter<S: Reflect, T: FromReflect + Typed>(name: &'static str, f: fn(&mut S, T)) -> Self {
        let call = move |target: &mut dyn Reflect, value: Box<dyn Reflect>| -> Result<(), AccessFault> {
            let found = target.reflect_type_path();
            let Some(receiver) = target.downcast_mut::<S>() else {
                return Err(AccessFault::Receiver {
                    method: name,
                    expected: core::any::type_name::<S>(),
                    found,
                });
            };
            let value = T::from_reflect(value).map_err(|value| AccessFault::Value {
                method: name,
                expected: T::type_info().type_path(),
                found: value.reflect_type_path(),
            })?;
            panic::catch_unwind(AssertUnwindSafe(|| f(receiver, value))).map_err(|payload| {
                AccessFault::Panicked {
                    method: name,
                    message: panic_message(payload),
                }
            })
        };
        Self {
            name,
            kind: MethodKind::Setter,
            value_type: T::type_info,
            call: Call::Set(Box::new(call)),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The type returned by a getter or accepted by a setter.
    #[inline]
    pub fn value_type(&self) -> &'static TypeInfo {
        (self.value_type)()
    }

    #[inline]
    pub fn value_type_fn(&self) -> fn() -> &'static TypeInfo {
        self.value_type
    }

    /// Invokes a getter.
    pub fn get(&self, target: &dyn Reflect) -> Result<Box<dyn Reflect>, AccessFault> {
        match &self.call {
            Call::Get(call) => call(target),
            Call::Set(_) => Err(AccessFault::WrongKind {
                method: self.name,
                actual: self.kind,
            }),
        }
    }

    /// Invokes a setter.
    pub fn set(&self, target: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<(), AccessFault> {
        match &self.call {
            Call::Set(call) => call(target, value),
            Call::Get(_) => Err(AccessFault::WrongKind {
                method: self.name,
                actual: self.kind,
            }),
        }
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type().type_path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessFault, MethodInfo};
    use crate::Reflect;

    struct Counter(u32);

    impl Counter {
        fn get_count(&self) -> u32 {
            self.0
        }

        fn set_count(&mut self, value: u32) {
            assert!(value < 100, "count overflow");
            self.0 = value;
        }
    }

    crate::impls::impl_reflect_opaque!(Counter => "tests::Counter");

    #[test]
    fn getter_and_setter() {
        let getter = MethodInfo::getter("get_count", Counter::get_count);
        let setter = MethodInfo::setter("set_count", Counter::set_count);

        let mut counter = Counter(3);
        let value = getter.get(&counter).unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&3));

        setter.set(&mut counter, Box::new(9_u32)).unwrap();
        assert_eq!(counter.0, 9);

        let err = setter.set(&mut counter, Box::new(9_i64)).unwrap_err();
        assert!(matches!(err, AccessFault::Value { .. }));

        let err = getter.get(&7_u8 as &dyn Reflect).unwrap_err();
        assert!(matches!(err, AccessFault::Receiver { .. }));
    }

    #[test]
    fn panics_are_caught() {
        let setter = MethodInfo::setter("set_count", Counter::set_count);
        let mut counter = Counter(0);
        let err = setter.set(&mut counter, Box::new(500_u32)).unwrap_err();
        match err {
            AccessFault::Panicked { message, .. } => assert!(message.contains("count overflow")),
            other => panic!("unexpected {other}"),
        }
        assert_eq!(counter.0, 0);
    }
}
