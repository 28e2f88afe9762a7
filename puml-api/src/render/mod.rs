//! Rendering engines.
//!
//! The [`RenderGateway`] trait lives in `puml_core` so that test doubles can
//! implement it without depending on this crate. This module holds the
//! production implementation that shells out to PlantUML.

pub mod plantuml_cli;

pub use plantuml_cli::PlantUmlCli;
pub use puml_core::RenderGateway;
