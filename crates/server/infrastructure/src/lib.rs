// Todo Domain Processor - Infrastructure Layer
// Concrete adapters grouped by technology

pub mod messaging;
pub mod observability;
pub mod persistence;
