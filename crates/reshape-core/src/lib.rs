//! Reshape Core - declarative JSON-to-JSON transformation
//!
//! A transform specification is itself a JSON document. Its plain fields are
//! copied to the target, while fields carrying reserved `$` directives pull
//! values out of the source document, run them through function pipelines,
//! validate them and map arrays element by element.
//!
//! # Main Components
//!
//! - **Transformer**: the interpreter entry point ([`Transformer`])
//! - **Traversal context**: per-call ancestor, array-index and path tracking
//! - **Extensions**: built-in functions, filters, constraints and sorters
//! - **Plugins**: Lua bundles and host-registered units for names the built-ins lack
//! - **Error Handling**: a single `thiserror` error type with location context
//!
//! # Example
//!
//! ```
//! let target = reshape_core::transform(
//!     r#"{"items": [{"n": "x"}, {"n": "y"}, {"n": "z"}]}"#,
//!     r#"{
//!         "items": {
//!             "$path": "items",
//!             "$include": [{"contains": {"$value": "n", "$what": "y"}}],
//!             "$structure": [{"n": {"$value": "n"}}]
//!         }
//!     }"#,
//! )
//! .unwrap();
//!
//! let value: serde_json::Value = serde_json::from_str(&target).unwrap();
//! assert_eq!(value, serde_json::json!({"items": [{"n": "y"}]}));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod node;
pub mod plugin;

// Re-export main types for convenience
pub use config::TransformerConfig;
pub use engine::directive::extension_references;
pub use engine::{TransformContext, Transformer};
pub use error::{Error, ExtensionKind, Result};
pub use extensions::{Constraint, ExtensionRegistry, Filter, Function, Sorter};
pub use node::{Cursor, Node};
pub use plugin::PluginLoader;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transform JSON text with the default configuration, returning pretty-printed JSON
pub fn transform(source: &str, spec: &str) -> Result<String> {
    Transformer::default().transform_str(source, spec)
}
