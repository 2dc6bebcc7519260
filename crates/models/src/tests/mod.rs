
/// Upsert semantics on in-memory collections
pub mod collection_tests;
