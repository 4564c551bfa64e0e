//! Dependency schema module
//!
//! This module defines what a cache entry can depend on: the
//! [`DependencyDescriptor`] tagged union, and the [`Entity`] model the data
//! layer implements so that mutations can be expanded into descriptors.

pub mod entity;
pub mod types;

pub use entity::{Entity, ForeignKey, ForeignKeySnapshot};
pub use types::DependencyDescriptor;
