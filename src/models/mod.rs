pub mod actor;
pub mod policy;
pub mod token;

pub use actor::Actor;
pub use policy::UserPolicy;
pub use token::{Token, TokenIntent};
