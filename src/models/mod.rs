pub mod cat;
pub mod identity;

pub use cat::Cat;
pub use identity::Identity;
