#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod access;
mod config;
mod convert;
mod engine;
mod error;
mod extension;
mod members;
mod model;
mod parse;
mod print;
mod resolver;
mod tracker;
mod writer;

pub mod json;
pub mod token;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use access::{Access, MemberDescriptor, MemberValue};
pub use config::{AccessorPair, EngineConfig, ReadOptions, ShowType, WriteOptions};
pub use convert::Converter;
pub use engine::{Engine, ReadOutcome, WriteOutcome};
pub use error::{ErrorKind, GraphError, Result, Site};
pub use extension::{
    CustomFactory, CustomWriter, ExtensionKey, ExtensionRegistry, MemberSink, MissingMemberHandler,
    ResolverCallbacks,
};
pub use members::MemberCatalog;
pub use model::{Graph, GraphNode, NodeBody, NodeIndex, NodeView, Primitive};
pub use parse::parse;
pub use print::print;
