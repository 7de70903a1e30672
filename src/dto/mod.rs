/// Health check payloads.
pub mod health;
/// Read-only public projections.
pub mod public;
pub mod validation;
pub mod ws;
