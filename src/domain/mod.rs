// Domain value objects for configuration
pub mod config;

// Countdown cycle state machine
pub mod cycle;

// Draw records and derived history
pub mod draw;

// Domain-specific error types
pub mod errors;

// Feature contract shared with scorers
pub mod ml;

// Port interfaces
pub mod ports;

// Prediction and verification value types
pub mod prediction;

// Repository traits
pub mod repositories;
