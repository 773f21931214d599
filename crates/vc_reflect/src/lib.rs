#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Derive output names this crate as `vc_reflect`, which also has to resolve
// for derives used inside the crate itself.
extern crate self as vc_reflect;

// -----------------------------------------------------------------------------
// Modules

mod impls;
mod reflect;

pub mod info;
pub mod ops;
pub mod registry;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use reflect::{FromReflect, Reflect, ReflectBox};
pub use vc_reflect_derive::Reflect;
