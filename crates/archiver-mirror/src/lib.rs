//! Resource graph mirroring.
//!
//! [`ResourceMirror::perform`] loads a set of seed locations and follows
//! every cross-resource reference until the closure is complete. Extra
//! assets named out-of-band (such as class icons) are contributed by
//! [`ExtraReferences`] strategies and are loaded without being traversed.

pub mod extract;
pub mod mirror;
pub mod set;

pub use extract::{ClassImageReferences, ExtraReferences, IMAGE_URI_DETAIL, LABEL_PROVIDER_ANNOTATION};
pub use mirror::ResourceMirror;
pub use set::MirroredSet;
