//! skoslens: a Language Server that makes Turtle files readable
//!
//! Opaque IRIs (`<urn:uuid:…>`, numbered vocabulary terms) are resolved to
//! their `skos:prefLabel` and shown to the editor as:
//!
//! - **Hover**: the label and the IRI under the cursor
//! - **Diagnostics**: a hint on every subject nobody labelled, plus syntax
//!   errors, undeclared prefixes and duplicate labels
//! - **Inlay hints**: the label rendered right after each labelled IRI
//!
//! # Architecture
//!
//! - [`turtle`]: tokenizer and error-tolerant recursive-descent parser
//! - [`iri`]: prefix table and IRI expansion, independent of directive order
//! - [`index`]: resolved triples, IRI occurrences and the label index
//! - [`document`] / [`workspace`]: open documents, edits and snapshots
//! - [`fetch`]: cached, deduplicated lookup of labels in namespace documents
//! - [`labels`]: local-then-external label resolution
//! - [`hover`], [`diagnostics`], [`inlay_hints`]: the editor features
//! - [`server`]: the `tower-lsp` front end
//! - [`config`]: settings
//!
//! # Usage
//!
//! ```ignore
//! use skoslens::fetch::Fetcher;
//! use skoslens::workspace::Workspace;
//!
//! let workspace = Workspace::new();
//! let snapshot = workspace.open(uri, text, 1);
//! let hints = skoslens::diagnostics::unlabeled(&snapshot, &Fetcher::disabled());
//! ```

// Parsing and indexing
pub mod index;
pub mod iri;
pub mod turtle;

// Document state
pub mod document;
pub mod workspace;

// Label resolution
pub mod fetch;
pub mod labels;

// LSP feature modules
pub mod diagnostics;
pub mod hover;
pub mod inlay_hints;

// Configuration and transport
pub mod config;
pub mod server;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
