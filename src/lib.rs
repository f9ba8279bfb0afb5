pub mod analysis;
pub mod assembly;
pub mod catalogue;
pub mod classify;
pub mod constants;
pub mod dimension;
pub mod error;
pub mod integrations;
pub mod neuron;
pub mod serialize;
