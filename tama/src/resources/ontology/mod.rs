//! Ontology resources: classes and their corpora

pub mod resource_class;
pub mod resource_class_corpus;

pub use resource_class::ClassResource;
pub use resource_class_corpus::ClassCorpusResource;
