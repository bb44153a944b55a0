mod message_role;

pub use message_role::*;
