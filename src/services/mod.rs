// Research Assistant services
// Services talk to the outside world or produce artifacts: search, auth, summaries, export, settings.

pub mod auth_client;
pub mod export;
pub mod search_client;
pub mod search_controller;
pub mod settings_engine;
pub mod summary;
