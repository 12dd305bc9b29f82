mod bedrock_server;
mod beta_server;
mod legacy_server;
mod regular_server;

pub use bedrock_server::*;
pub use beta_server::*;
pub use legacy_server::*;
pub use regular_server::*;
