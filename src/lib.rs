//! Core parsing engine for wirework configuration documents.
//!
//! A wirework document is an element tree of object-construction recipes:
//! each `definition` element describes how one object is to be built (its
//! type, constructor arguments, properties, lifecycle methods), and scopes
//! of definitions can nest, each carrying its own defaults. This crate turns
//! such a tree into a graph of [`model::Definition`] metadata and registers
//! it with a [`registry::DefinitionRegistry`]; it never instantiates
//! anything.
//!
//! The tree itself comes from an external tokenizer as
//! [`element::Element`] values, so the engine is independent of the markup
//! syntax. Parsing is resilient: malformed fragments are recorded as
//! [`diagnostics::Problem`]s and dropped, and the rest of the document is
//! still processed.
//!
//! ```
//! use wirework_core::element::Element;
//! use wirework_core::extension::ExtensionRegistry;
//! use wirework_core::registry::InMemoryRegistry;
//! use wirework_core::parse_document;
//!
//! let doc = Element::new("definitions").with_child(
//!     Element::new("definition")
//!         .with_attr("id", "mailer")
//!         .with_attr("class", "acme.Mailer")
//!         .with_child(
//!             Element::new("property")
//!                 .with_attr("name", "retries")
//!                 .with_attr("value", "3"),
//!         ),
//! );
//!
//! let extensions = ExtensionRegistry::new();
//! let mut registry = InMemoryRegistry::new();
//! let outcome = parse_document(&doc, &mut registry, &extensions, None);
//! assert!(!outcome.has_problems());
//! assert_eq!(outcome.registered, vec!["mailer"]);
//! ```

pub mod api;
pub mod defaults;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod extension;
pub mod model;
pub mod parser;
pub mod registry;
pub mod utils;

pub use api::{parse_document, ParseOutcome};
