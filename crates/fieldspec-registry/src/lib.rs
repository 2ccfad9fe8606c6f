//! # fieldspec-registry: Schema Builder and Field Registries
//!
//! Turns an ordered list of field definitions into an immutable
//! [`FieldRegistry`]. There is one constructor, [`FieldRegistry::build`];
//! definitions written in Rust ([`FieldDef`], [`BuildOptions`]) and
//! definitions loaded at runtime ([`SchemaDocument`]) both go through it.
//!
//! ## Contents
//!
//! - [`field`]: field definitions and descriptors.
//! - [`hooks`]: the hook contract, hook identities and the [`HookTable`].
//! - [`builder`]: build options and the registry itself.
//! - [`catalog`]: a set of registries that may reference each other.
//! - [`document`]: serde-loadable schema documents.

pub mod builder;
pub mod catalog;
pub mod document;
pub mod error;
pub mod field;
pub mod hooks;

pub use builder::{BuildOptions, DerivedDef, DerivedErrorMode, DerivedHook, FieldRegistry};
pub use catalog::Catalog;
pub use document::{DerivedDocument, FieldDocument, SchemaDocument, SchemaFile};
pub use error::BuildError;
pub use field::{FieldDef, FieldDescriptor, FieldOptions};
pub use hooks::{Hook, HookFailure, HookFn, HookIdentity, HookRef, HookTable, ResolvedHook};
