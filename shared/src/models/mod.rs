//! Domain models for the Crop Advisor platform

mod climate;
mod crop;
mod location;
mod recommendation;
mod session;

pub use climate::*;
pub use crop::*;
pub use location::*;
pub use recommendation::*;
pub use session::*;
