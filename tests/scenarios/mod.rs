//! Scenario-based tests for toolpipe

mod fix_proposal;
mod halting;
mod properties;
mod quality_gate;
