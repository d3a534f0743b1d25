pub mod errors;
pub mod provider;
pub mod security;
pub mod settings;
pub mod state;
pub mod text;
