use crate::Reflect;

/// Access to the active variant of an enum and its named fields.
///
/// Switching variants goes through
/// [`EnumInfo::construct`](crate::info::EnumInfo::construct) and
/// [`Reflect::set`].
pub trait Enum: Reflect {
    fn variant_name(&self) -> &'static str;

    fn variant_index(&self) -> usize;

    fn field(&self, name: &str) -> Option<&dyn Reflect>;

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Reflect>;

    fn field_at(&self, index: usize) -> Option<&dyn Reflect>;

    fn field_at_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    fn field_len(&self) -> usize;
}
