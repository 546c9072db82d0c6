//! Scenario tests driving the exit game through its public operations.

mod challenge;
