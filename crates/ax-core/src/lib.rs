//! Core runtime for articy exports: identifiers, the expresso value type, the
//! clone- and shadow-aware object store, and the object database.
//!
//! Nothing here evaluates scripts. The `ax-expresso` crate builds on these
//! types to run conditions and instructions against a database.

/// Clone- and shadow-aware storage for one object.
pub mod cloneable;
/// Database configuration.
pub mod config;
/// The object database and package lifecycle.
pub mod database;
/// Error types used throughout the crate.
pub mod error;
/// Object ids and compound handles.
pub mod id;
/// Reading exports through the archive interface.
pub mod import;
/// Narrative objects and the duplicate primitive.
pub mod object;
/// Packages of canonical objects.
pub mod package;
/// Stored properties and the per-kind accessor registry.
pub mod property;
/// Shadow levels and pop callbacks.
pub mod shadow;
/// Object type definitions.
pub mod types;
/// The expresso value type.
pub mod value;

/// Re-export store types.
pub use cloneable::{CloneableObject, ShadowableObject, Shared};
/// Re-export configuration.
pub use config::DatabaseConfig;
/// Re-export database types.
pub use database::{ArticyDatabase, ObjectEntry, ObjectRef};
/// Re-export error types.
pub use error::{AxError, AxResult};
/// Re-export id types.
pub use id::{ArticyId, CloneId, NEXT_FREE_CLONE};
/// Re-export import types.
pub use import::{Archive, DirectoryArchive, MemoryArchive, ProjectExport, ScriptKind, ScriptSource};
/// Re-export object types.
pub use object::{ArticyObject, Duplicate};
/// Re-export package types.
pub use package::ArticyPackage;
/// Re-export property types.
pub use property::{PropertyBag, PropertyKind, PropertyValue};
/// Re-export shadow types.
pub use shadow::{PopHandle, ShadowState, ShadowStateManager};
/// Re-export type system types.
pub use types::{ArticyType, TypeSystem};
/// Re-export value types.
pub use value::{ExpressoValue, ValueType};
