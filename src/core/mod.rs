//! Core module — symbol vectors and the vocabulary that owns them.

pub mod vector;
pub mod vocabulary;
