//! core
//!
//! Core domain types, schemas, and validation for Schemata.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ElementId, typed handles, ObjectId, etc.
//! - [`error`] - The single metamodel error type
//! - [`naming`] - Element naming rules and qualified names
//! - [`primitive`] - Primitive type tags and data types
//! - [`value`] - Scalar values and their validation
//! - [`collection`] - Typed collections with change notification
//! - [`record`] - Stored record shapes and the store document
//! - [`graph`] - Hierarchy graphs over element ids
//! - [`verify`] - Structural verification of records
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - All verification is deterministic

pub mod collection;
pub mod config;
pub mod error;
pub mod graph;
pub mod naming;
pub mod primitive;
pub mod record;
pub mod types;
pub mod value;
pub mod verify;
