pub mod reveal;

pub use reveal::{OutputReveal, RevealBackend};
