// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Every value that can reach a runtime command line passes through here first.

mod env_entry;
mod id;
mod image_ref;
mod kind;
mod label;
mod port_mapping;
mod resource_name;

pub use env_entry::{EnvEntry, EnvEntryError};
pub use id::{ContainerId, Id, ImageId, NetworkId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use kind::ResourceKind;
pub use label::{LabelError, check_label};
pub use port_mapping::{PortMapping, PortMappingError, Protocol};
pub use resource_name::{MAX_NAME_LENGTH, ResourceName, ResourceNameError};
