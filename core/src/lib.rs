//! Configuration and conversation bookkeeping shared by the chatbot front-ends.

pub mod config;
mod config_override;
pub mod conversation;
mod home;

pub use config_override::CliConfigOverrides;
pub use home::find_chatbot_home;
