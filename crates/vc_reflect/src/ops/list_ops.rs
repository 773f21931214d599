use crate::info::{GenericTypeInfoCell, ListInfo, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeRegistry, TypeTraitDefault, TypeTraitShared};
use crate::{FromReflect, Reflect};

// -----------------------------------------------------------------------------
// List

/// An ordered, growable sequence.
pub trait List: Reflect {
    fn get(&self, index: usize) -> Option<&dyn Reflect>;

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    fn len(&self) -> usize;

    /// Appends `value`, handing it back on a type mismatch.
    fn push(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    /// Overwrites the element at `index`, handing `value` back on a type
    /// mismatch or when `index` is out of bounds.
    fn replace(&mut self, index: usize, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    fn iter(&self) -> Box<dyn Iterator<Item = &dyn Reflect> + '_> {
        Box::new((0..self.len()).filter_map(|index| self.get(index)))
    }
}

// -----------------------------------------------------------------------------
// Vec<T>

impl<T: FromReflect + GetTypeMeta> Reflect for Vec<T> {
    crate::impls::impl_reflect_common!();

    #[inline]
    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::List(self)
    }

    #[inline]
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::List(self)
    }
}

impl<T: FromReflect + GetTypeMeta> List for Vec<T> {
    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        <[T]>::get(self, index).map(|item| item as &dyn Reflect)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        <[T]>::get_mut(self, index).map(|item| item as &mut dyn Reflect)
    }

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn push(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        Vec::push(self, T::from_reflect(value)?);
        Ok(())
    }

    fn replace(&mut self, index: usize, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        if index >= Vec::len(self) {
            return Err(value);
        }
        self[index] = T::from_reflect(value)?;
        Ok(())
    }
}

impl<T: FromReflect + GetTypeMeta> FromReflect for Vec<T> {}

impl<T: FromReflect + GetTypeMeta> Typed for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::List(ListInfo::new::<Self, T>()))
    }
}

impl<T: FromReflect + GetTypeMeta> GetTypeMeta for Vec<T> {
    fn get_type_meta() -> TypeMeta {
        let mut meta = TypeMeta::of::<Self>();
        meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
        meta.insert_trait(<TypeTraitShared as FromType<Self>>::from_type());
        meta
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

#[cfg(test)]
mod tests {
    use crate::ops::{List, ReflectRef};
    use crate::{Reflect, ReflectBox};

    #[test]
    fn push_and_replace() {
        let mut list: Vec<u8> = vec![1, 2];
        List::push(&mut list, Box::new(3_u8)).unwrap();
        assert!(List::push(&mut list, Box::new(5_i32)).is_err());
        list.replace(0, Box::new(9_u8)).unwrap();
        assert!(list.replace(7, Box::new(9_u8)).is_err());
        assert_eq!(list, [9, 2, 3]);

        let ReflectRef::List(view) = list.reflect_ref() else {
            panic!("not a list");
        };
        let items: Vec<u8> = view.iter().filter_map(|v| v.downcast_ref::<u8>().copied()).collect();
        assert_eq!(items, [9, 2, 3]);
    }

    #[test]
    fn untyped_list_accepts_anything() {
        let mut list: Vec<ReflectBox> = Vec::new();
        List::push(&mut list, Box::new(1_i64)).unwrap();
        List::push(&mut list, Box::new(String::from("two"))).unwrap();
        assert_eq!(List::len(&list), 2);
        assert_eq!(list[1].downcast_ref::<String>().map(String::as_str), Some("two"));
    }
}
