pub mod dispatcher;
pub mod orchestrator;
pub mod reporter;
