crate::impls::impl_reflect_opaque!(() => "()", default);
crate::impls::impl_reflect_opaque!(bool => "bool", default);
crate::impls::impl_reflect_opaque!(char => "char", default);

crate::impls::impl_reflect_opaque!(i8 => "i8", default);
crate::impls::impl_reflect_opaque!(i16 => "i16", default);
crate::impls::impl_reflect_opaque!(i32 => "i32", default);
crate::impls::impl_reflect_opaque!(i64 => "i64", default);
crate::impls::impl_reflect_opaque!(i128 => "i128", default);
crate::impls::impl_reflect_opaque!(isize => "isize", default);

crate::impls::impl_reflect_opaque!(u8 => "u8", default);
crate::impls::impl_reflect_opaque!(u16 => "u16", default);
crate::impls::impl_reflect_opaque!(u32 => "u32", default);
crate::impls::impl_reflect_opaque!(u64 => "u64", default);
crate::impls::impl_reflect_opaque!(u128 => "u128", default);
crate::impls::impl_reflect_opaque!(usize => "usize", default);

crate::impls::impl_reflect_opaque!(f32 => "f32", default);
crate::impls::impl_reflect_opaque!(f64 => "f64", default);

crate::impls::impl_reflect_opaque!(String => "String", default);

#[cfg(test)]
mod tests {
    use crate::Reflect;
    use crate::info::{ReflectKind, Typed};
    use crate::registry::{GetTypeMeta, TypeTraitDefault};

    #[test]
    fn primitives_are_opaque() {
        assert_eq!(7_u64.reflect_kind(), ReflectKind::Opaque);
        assert_eq!(String::type_info().type_path(), "String");
        assert_eq!(<()>::type_info().type_name(), "()");

        let meta = <f64 as GetTypeMeta>::get_type_meta();
        let zero = meta.get_trait::<TypeTraitDefault>().unwrap().default_value();
        assert_eq!(zero.downcast_ref::<f64>(), Some(&0.0));
    }

    #[test]
    fn set_checks_the_type() {
        let mut value = 1_i32;
        value.set(Box::new(4_i32)).unwrap();
        assert_eq!(value, 4);
        assert!(value.set(Box::new(4_i64)).is_err());
    }
}
