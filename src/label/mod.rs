pub mod backend;
pub mod gemini;
pub mod orchestrator;
pub mod prompt;
pub mod quality;
pub mod speaker;
