mod kopek;
mod secret;

pub use kopek::{Kopek, KopekParseError};
pub use secret::Secret;
