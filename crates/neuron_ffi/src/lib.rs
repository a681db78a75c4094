//! Flutter-facing bindings for the Neuron reminder core.

pub mod api;
