// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Converters from external objects to policy objects

pub mod k8s;
