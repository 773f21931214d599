use core::any::TypeId;

use vc_reflect::Reflect;
use vc_reflect::info::{MethodInfo, TypeInfo, Visibility};
use vc_reflect::ops::{ReflectMut, ReflectRef};

use crate::error::{ErrorKind, Result};

// -----------------------------------------------------------------------------
// Access

/// How a member's value is read and written.
#[derive(Clone, Copy, Debug)]
pub enum Access {
    /// Through the field at `index` of the declaring type.
    Direct { index: usize },
    /// Through accessor methods. A missing side falls back to the field.
    Methods {
        getter: Option<&'static MethodInfo>,
        setter: Option<&'static MethodInfo>,
        index: usize,
    },
    /// The variant name of an enum value. Read only.
    VariantName,
}

// -----------------------------------------------------------------------------
// MemberValue

/// The value of a member: borrowed from a field or produced by a getter.
#[derive(Debug)]
pub enum MemberValue<'a> {
    Borrowed(&'a dyn Reflect),
    Owned(Box<dyn Reflect>),
}

impl MemberValue<'_> {
    #[inline]
    pub fn as_reflect(&self) -> &dyn Reflect {
        match self {
            MemberValue::Borrowed(value) => *value,
            MemberValue::Owned(value) => &**value,
        }
    }
}

// -----------------------------------------------------------------------------
// MemberDescriptor

/// One serializable member of a reflected type.
///
/// Descriptors are built by the [`MemberCatalog`](crate::MemberCatalog). A
/// member may be declared on a base struct several `#[reflect(base)]` levels
/// up; `route` holds the base field indices leading there.
#[derive(Clone, Debug)]
pub struct MemberDescriptor {
    pub(crate) target_type: TypeId,
    pub(crate) declaring: &'static TypeInfo,
    pub(crate) name: &'static str,
    pub(crate) unique_name: String,
    pub(crate) value_type: fn() -> &'static TypeInfo,
    pub(crate) visibility: Visibility,
    pub(crate) route: Box<[usize]>,
    pub(crate) access: Access,
}

impl MemberDescriptor {
    /// The type that declares the member.
    #[inline]
    pub fn declaring_type(&self) -> &'static TypeInfo {
        self.declaring
    }

    /// The declared name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The name used in documents. Differs from [`name`](Self::name) for a
    /// member shadowed by a more derived declaration.
    #[inline]
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// The type the getter or field yields.
    #[inline]
    pub fn value_type(&self) -> &'static TypeInfo {
        (self.value_type)()
    }

    /// The type [`set`](Self::set) expects.
    pub fn set_type(&self) -> &'static TypeInfo {
        match self.access {
            Access::Methods {
                setter: Some(setter),
                ..
            } => setter.value_type(),
            _ => self.value_type(),
        }
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        true
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        !matches!(self.access, Access::VariantName)
    }

    fn owner_of<'a>(&self, target: &'a dyn Reflect) -> Result<&'a dyn Reflect> {
        if target.ty_id() != self.target_type {
            return Err(ErrorKind::InvalidTarget.into());
        }
        let mut owner = target;
        for &index in &self.route {
            let ReflectRef::Struct(value) = owner.reflect_ref() else {
                return Err(ErrorKind::InvalidTarget.into());
            };
            owner = value.field_at(index).ok_or(ErrorKind::InvalidTarget)?;
        }
        Ok(owner)
    }

    fn owner_of_mut<'a>(&self, target: &'a mut dyn Reflect) -> Result<&'a mut dyn Reflect> {
        if target.ty_id() != self.target_type {
            return Err(ErrorKind::InvalidTarget.into());
        }
        let mut owner = target;
        for &index in &self.route {
            let ReflectMut::Struct(value) = owner.reflect_mut() else {
                return Err(ErrorKind::InvalidTarget.into());
            };
            owner = value.field_at_mut(index).ok_or(ErrorKind::InvalidTarget)?;
        }
        Ok(owner)
    }

    fn field_of(owner: &dyn Reflect, index: usize) -> Option<&dyn Reflect> {
        match owner.reflect_ref() {
            ReflectRef::Struct(value) => value.field_at(index),
            ReflectRef::Enum(value) => value.field_at(index),
            _ => None,
        }
    }

    fn field_of_mut(owner: &mut dyn Reflect, index: usize) -> Option<&mut dyn Reflect> {
        match owner.reflect_mut() {
            ReflectMut::Struct(value) => value.field_at_mut(index),
            ReflectMut::Enum(value) => value.field_at_mut(index),
            _ => None,
        }
    }

    /// Reads the member of `target`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidTarget`] when `target` is not the type the
    /// descriptor was built for, [`ErrorKind::AccessorInvocation`] when a
    /// getter fails.
    pub fn get<'a>(&self, target: &'a dyn Reflect) -> Result<MemberValue<'a>> {
        let owner = self.owner_of(target)?;
        match self.access {
            Access::Direct { index }
            | Access::Methods {
                getter: None,
                index,
                ..
            } => Self::field_of(owner, index)
                .map(MemberValue::Borrowed)
                .ok_or_else(|| ErrorKind::InvalidTarget.into()),
            Access::Methods {
                getter: Some(getter),
                ..
            } => Ok(MemberValue::Owned(getter.get(owner)?)),
            Access::VariantName => match owner.reflect_ref() {
                ReflectRef::Enum(value) => Ok(MemberValue::Owned(Box::new(String::from(
                    value.variant_name(),
                )))),
                _ => Err(ErrorKind::InvalidTarget.into()),
            },
        }
    }

    /// Writes the member of `target`.
    ///
    /// `value` must have the type [`set_type`](Self::set_type) reports.
    pub fn set(&self, target: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<()> {
        let owner = self.owner_of_mut(target)?;
        match self.access {
            Access::Direct { index }
            | Access::Methods {
                setter: None,
                index,
                ..
            } => {
                let slot = Self::field_of_mut(owner, index).ok_or(ErrorKind::InvalidTarget)?;
                let expected = slot.reflect_type_path();
                slot.set(value)
                    .map_err(|value| ErrorKind::unsupported(value.reflect_type_path(), expected).into())
            }
            Access::Methods {
                setter: Some(setter),
                ..
            } => Ok(setter.set(owner, value)?),
            Access::VariantName => Err(ErrorKind::InvalidTarget.into()),
        }
    }

    /// The field behind the member, for in-place updates. `None` for members
    /// without a backing field.
    pub fn get_mut<'a>(&self, target: &'a mut dyn Reflect) -> Option<&'a mut dyn Reflect> {
        let owner = self.owner_of_mut(target).ok()?;
        match self.access {
            Access::Direct { index } | Access::Methods { index, .. } => {
                Self::field_of_mut(owner, index)
            }
            Access::VariantName => None,
        }
    }
}

/// Finds a member by its document name.
pub(crate) fn find_member<'a>(
    members: &'a [MemberDescriptor],
    name: &str,
) -> Option<(usize, &'a MemberDescriptor)> {
    members
        .iter()
        .enumerate()
        .find(|(_, member)| member.unique_name == name)
}
