use core::any::TypeId;

use crate::Reflect;
use crate::info::{MethodInfo, Type, TypeInfo, Typed};

// -----------------------------------------------------------------------------
// FieldFlags

bitflags::bitflags! {
    /// Field markers set by `#[reflect(..)]` field attributes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u8 {
        /// The field embeds the parent type of an inheritance chain.
        const BASE = 1 << 0;
        /// Runtime-only state that is never written.
        const TRANSIENT = 1 << 1;
        /// Compiler or macro generated, e.g. `PhantomData`.
        const SYNTHETIC = 1 << 2;
        /// Process-wide state shared by every instance.
        const GLOBAL = 1 << 3;
    }
}

/// Declared visibility of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Crate,
    Restricted,
    #[default]
    Private,
}

// -----------------------------------------------------------------------------
// NamedField

/// A named field of a struct or of an enum variant.
#[derive(Clone, Debug)]
pub struct NamedField {
    name: &'static str,
    index: usize,
    type_id: TypeId,
    type_info: fn() -> &'static TypeInfo,
    flags: FieldFlags,
    visibility: Visibility,
}

impl NamedField {
    #[inline]
    pub fn new<T: Typed>(name: &'static str, index: usize) -> Self {
        Self {
            name,
            index,
            type_id: TypeId::of::<T>(),
            type_info: T::type_info,
            flags: FieldFlags::empty(),
            visibility: Visibility::Private,
        }
    }

    #[inline]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Position of the field in declaration order.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        (self.type_info)()
    }

    #[inline]
    pub fn type_info_fn(&self) -> fn() -> &'static TypeInfo {
        self.type_info
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        self.flags.contains(FieldFlags::BASE)
    }
}

// -----------------------------------------------------------------------------
// StructInfo

/// Type information of a struct with named fields.
///
/// Besides fields, a struct carries the accessor methods registered with
/// `#[reflect(getters(..), setters(..))]` and the capability names declared
/// with `#[reflect(implements(..))]`.
#[derive(Debug)]
pub struct StructInfo {
    ty: Type,
    fields: Box<[NamedField]>,
    methods: Box<[MethodInfo]>,
    capabilities: &'static [&'static str],
}

impl StructInfo {
    pub fn new<T: Reflect>(path: &'static str, fields: Vec<NamedField>) -> Self {
        Self {
            ty: Type::with_path::<T>(path),
            fields: fields.into_boxed_slice(),
            methods: Box::new([]),
            capabilities: &[],
        }
    }

    #[inline]
    pub fn with_methods(mut self, methods: Vec<MethodInfo>) -> Self {
        self.methods = methods.into_boxed_slice();
        self
    }

    #[inline]
    pub fn with_capabilities(mut self, capabilities: &'static [&'static str]) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.ty.path()
    }

    #[inline]
    pub fn fields(&self) -> &[NamedField] {
        &self.fields
    }

    #[inline]
    pub fn field_len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn field_at(&self, index: usize) -> Option<&NamedField> {
        self.fields.get(index)
    }

    pub fn field(&self, name: &str) -> Option<&NamedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The field marked `#[reflect(base)]`, if any.
    pub fn base(&self) -> Option<&NamedField> {
        self.fields.iter().find(|field| field.is_base())
    }

    #[inline]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name() == name)
    }

    #[inline]
    pub fn capabilities(&self) -> &'static [&'static str] {
        self.capabilities
    }
}
