//! Batch artifact output
//!
//! # Artifact layout
//!
//! ```text
//! <delete><id>A</id><id>B</id></delete>     (only when a delete list is given)
//! <add>
//! <doc><field name="id">…</field>…</doc>    (one line per indexed image)
//! …
//! </add>
//! ```

pub mod batch;
pub mod document;

pub use batch::BatchWriter;
pub use document::{escape_xml, DocumentFragment};
