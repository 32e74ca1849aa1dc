//! Shared type definitions for the CodeTel simulator
//!
//! Three groups: the seed document schema (input), the corpus entities
//! (generated data), and the wire types for both HTTP families.

pub mod api;
pub mod corpus;
pub mod seed;

pub use api::*;
pub use corpus::*;
pub use seed::*;
