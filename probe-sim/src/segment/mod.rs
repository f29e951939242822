pub mod responder;
pub mod sessions;
