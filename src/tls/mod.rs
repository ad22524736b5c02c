pub mod client;
pub mod crypto_provider;
pub mod noverify;
pub mod settings;
