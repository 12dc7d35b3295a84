//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hallmark.toml`:
//!
//! | Module   | TOML Section                 | Purpose                          |
//! |----------|------------------------------|----------------------------------|
//! | `build`  | `[build]`                    | Input/output roots, workers      |
//! | `serve`  | `[serve]`                    | HTTP interface and port          |
//! | `dev`    | `[dev]`                      | Live reload debounce and ignores |
//! | `routes` | `[[routes]]`, `[not_found]`  | Declarative route table          |

mod build;
mod dev;
pub mod routes;
mod serve;

pub use build::BuildSectionConfig;
pub use dev::DevConfig;
pub use routes::{CacheConfig, RouteConfig};
pub use serve::ServeConfig;
