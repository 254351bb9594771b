//! Shader programs: building, introspection and binding reconciliation.

mod binding;
mod builder;
mod sources;

pub use binding::{
    reconcile, AttributeSlot, BindingDescription, BindingDescriptions, BindingKind,
    BindingRequirement, Linked, ResolvedBinding, ResolvedLocation, Unlinked,
};
pub use builder::{build, Shader};
pub use sources::{shader_v0, ShaderKey, ShaderSources, SHADER_V0_FRAGMENT, SHADER_V0_VERTEX};
