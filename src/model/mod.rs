//! Structural model data: the entities a snapshot is made of

mod element;
mod loads;
mod material;
mod node;
mod section;
mod snapshot;

pub use element::{Element, EndReleases};
pub use loads::{DistributedLoad, Load, LoadCase, LoadCombination, NodalLoad};
pub use material::Material;
pub use node::Node;
pub use section::Section;
pub use snapshot::{ModelSnapshot, MIN_ELEMENT_LENGTH};
