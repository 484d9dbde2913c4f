//! Core circuit snapshot model and solver-internal structures for VoltLab.
//!
//! This crate provides the element/wire snapshot shape exchanged with the
//! editing layer, the per-tick net topology resolver (union-find over node
//! ids), and the Modified Nodal Analysis (MNA) matrix system the electrical
//! solver stamps into.

pub mod mna;
pub mod snapshot;
pub mod topology;

pub use mna::{MnaSystem, NetIndexer};
pub use snapshot::{
    Computed, Element, ElementKind, LedColor, LedVisual, MeterMode, Node, Properties, Runtime,
    SwitchPosition, Wire,
};
pub use topology::{NetId, NetMap};
