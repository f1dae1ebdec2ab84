// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Converter for k8s networking and core objects to policy objects
//!
//! Only the parts of a rule that this crate compiles are converted: port lists and IP block
//! peers. Pod and namespace selectors are evaluated elsewhere, and the pods they select reach
//! the rule as [`crate::PodPeer`]s.

pub mod ipblock;
pub mod pod;
pub mod port;
pub mod rule;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FromK8sConversionError {
    #[error("Invalid k8s object: {0}")]
    Invalid(String),
    #[error("Missing required data: {0}")]
    MissingData(String),
    #[error("Could not parse value: {0}")]
    ParseError(String),
    #[error("Unsupported k8s object: {0}")]
    Unsupported(String),
}
