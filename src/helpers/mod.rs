pub(crate) mod combine;
pub(crate) mod common;
pub(crate) mod keyed;
pub(crate) mod stdlib;

// Sources are free functions; everything else extends `PCollection`.
pub use stdlib::*;
