pub mod descriptor;
pub mod presets;

pub use descriptor::{
    compute_identity, validate, DescriptorDraft, EndpointDescriptor, Transport, TransportKind,
    ValidationError,
};
pub use presets::{find_preset, preset_draft, presets, Preset};
