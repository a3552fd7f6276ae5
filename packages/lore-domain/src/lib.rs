pub mod enrichment;
pub mod intake;
pub mod resource_type;
pub mod source_kind;
pub mod urls;
