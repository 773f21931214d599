use crate::registry::TypeRegistry;

/// A registration function submitted by `#[reflect(auto_register)]`.
pub struct AutoRegister(pub fn(&mut TypeRegistry));

inventory::collect!(AutoRegister);

pub(crate) fn register_all(registry: &mut TypeRegistry) {
    for AutoRegister(register) in inventory::iter::<AutoRegister> {
        register(registry);
    }
}
