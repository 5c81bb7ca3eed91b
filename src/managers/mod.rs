// Research Assistant state managers
// Managers own in-memory state that outlives a single request.

pub mod history_manager;
