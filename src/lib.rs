//! distill, a tool keeping the published entry points of JavaScript packages honest.

#![warn(missing_docs)]

pub mod cli;
