//! Texmat Resolve - Component resolution for texture archives
//!
//! Turns the file names found in an extracted archive into at most one
//! [`ResolvedComponent`] per [`MapKind`], checking that every component
//! agrees on resolution and applying the user's [`MaterialSpec`].

mod grammar;
mod map_kind;
mod resolver;
mod spec;

pub use grammar::{classify, Classified, FilenameGrammar};
pub use map_kind::{MapKind, MapKindInfo, ShaderInput, ShaderTarget};
pub use resolver::{resolve, Resolution, ResolvedComponent};
pub use spec::{DisplacementUsage, MaterialSpec, PreferenceList};
