//! Model types shared by the setup archiver crates.
//!
//! A mirroring run works on [`Resource`]s, each loaded from one
//! [`Location`]. Model resources are XML documents parsed into a flat list
//! of [`ModelObject`]s whose attributes yield outgoing [`Reference`]s;
//! binary resources (images and other assets) are carried as opaque bytes.
//!
//! The [`ResourceFactoryRegistry`] decides which of the two kinds a
//! location is loaded as, based on its file extension.

pub mod diagnostic;
pub mod error;
pub mod location;
pub mod object;
pub mod registry;
pub mod resource;

mod xml;

pub use diagnostic::Diagnostic;
pub use error::{ModelError, Result};
pub use location::Location;
pub use object::{Annotation, ModelObject, Reference};
pub use registry::{
    DEFAULT_BINARY_EXTENSIONS, DEFAULT_MODEL_EXTENSIONS, ECORE_NS_URI, ResourceFactoryRegistry,
};
pub use resource::{Resource, ResourceKind};
