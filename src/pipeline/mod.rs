pub mod normalize;
pub mod persistence;
pub mod project;

pub use normalize::normalize;
pub use project::{
    AudioConfig, ModSelector, Modulation, SampleDescriptor, SampleSlot, Step, Track,
};
