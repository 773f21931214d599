use crate::Reflect;
use crate::info::{NamedField, Type};

// -----------------------------------------------------------------------------
// VariantInfo

/// One variant of a reflected enum: a unit variant or a variant with named fields.
#[derive(Clone, Debug)]
pub struct VariantInfo {
    name: &'static str,
    index: usize,
    fields: Box<[NamedField]>,
}

impl VariantInfo {
    #[inline]
    pub fn unit(name: &'static str, index: usize) -> Self {
        Self::new(name, index, Vec::new())
    }

    #[inline]
    pub fn new(name: &'static str, index: usize, fields: Vec<NamedField>) -> Self {
        Self {
            name,
            index,
            fields: fields.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn fields(&self) -> &[NamedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&NamedField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        self.fields.is_empty()
    }
}

// -----------------------------------------------------------------------------
// EnumInfo

/// Type information of an enum.
///
/// The variant table is the enum's constant table: reading a variant name
/// back always yields that exact variant, built by the derive-generated
/// constructor with default field values.
#[derive(Debug)]
pub struct EnumInfo {
    ty: Type,
    variants: Box<[VariantInfo]>,
    construct: fn(usize) -> Option<Box<dyn Reflect>>,
    capabilities: &'static [&'static str],
}

impl EnumInfo {
    pub fn new<T: Reflect>(
        path: &'static str,
        variants: Vec<VariantInfo>,
        construct: fn(usize) -> Option<Box<dyn Reflect>>,
    ) -> Self {
        Self {
            ty: Type::with_path::<T>(path),
            variants: variants.into_boxed_slice(),
            construct,
            capabilities: &[],
        }
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
    pub fn variants(&self) -> &[VariantInfo] {
        &self.variants
    }

    #[inline]
    pub fn variant_at(&self, index: usize) -> Option<&VariantInfo> {
        self.variants.get(index)
    }

    /// Finds a variant by its exact name.
    pub fn variant(&self, name: &str) -> Option<&VariantInfo> {
        self.variants.iter().find(|variant| variant.name == name)
    }

    /// Builds the variant at `index` with default field values.
    #[inline]
    pub fn construct(&self, index: usize) -> Option<Box<dyn Reflect>> {
        (self.construct)(index)
    }

    #[inline]
    pub fn capabilities(&self) -> &'static [&'static str] {
        self.capabilities
    }
}
