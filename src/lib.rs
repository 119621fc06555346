//! Schemata - A reflective metamodel engine
//!
//! Schemata holds a schema of classes, attributes and references organized
//! in packages, loads it lazily from a pluggable store and tracks every
//! change made to it. Objects created from the schema validate their values
//! against it.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, the type system, records, verification and
//!   configuration
//! - [`adapter`] - Persistence adapters (memory, JSON file)
//! - [`model`] - The live metamodel graph and objects
//!
//! # Correctness Invariants
//!
//! Schemata maintains the following invariants:
//!
//! 1. Names are unique among the children of a package and among the
//!    direct members of a class
//! 2. Superclass chains and package nesting never loop
//! 3. Back-reference sets always agree with the forward links
//! 4. A failed operation leaves the graph exactly as it was
//!
//! # Example
//!
//! ```
//! use schemata::adapter::MemoryAdapter;
//! use schemata::core::primitive::{DataType, PrimitiveType};
//! use schemata::model::{Metamodel, Object};
//!
//! let mut model = Metamodel::new(Box::new(MemoryAdapter::new()));
//! let animal = model.create_class("Animal", None, None).unwrap();
//! let dog = model.create_class("Dog", Some(animal), None).unwrap();
//! model
//!     .create_attribute(animal, "name", DataType::of(PrimitiveType::String))
//!     .unwrap();
//!
//! let mut rex = Object::new(&mut model, dog).unwrap();
//! rex.set(&mut model, "name", "Rex").unwrap();
//! assert!(rex.set(&mut model, "name", 7).is_err());
//! ```

pub mod adapter;
pub mod core;
pub mod model;

pub use crate::core::error::{ErrorReason, MetaError, MetaResult};
pub use crate::model::{Metamodel, Object};
