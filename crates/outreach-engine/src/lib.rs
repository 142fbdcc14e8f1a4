//! Stakeholder outreach pipeline: roster and summary extraction, per
//! stakeholder context, strategy-driven drafting and the
//! generate-evaluate-refine quality gate.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod extractor;
pub mod ger;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod reference;
pub mod strategy;

#[cfg(test)]
mod fixtures;

pub use config::{EngineConfig, GateConfig};
pub use error::{EngineError, StrategyError};
pub use extractor::ContextExtractor;
pub use ger::GerEngine;
pub use orchestrator::{
    parse_selection, AllStakeholders, Orchestrator, ReportAnalysis, ReportSource, RunOutput, StakeholderSelector,
};
pub use planner::{ContextSource, GenerationRequest, PlannedContext, TaskPlanner};
pub use reference::ReferenceMaterial;
pub use strategy::{GenerationStrategy, StrategyContext, StrategySet};
