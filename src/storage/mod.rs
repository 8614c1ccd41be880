pub mod database;
pub mod knowledge_store;
pub mod similarity;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use knowledge_store::{
    Contribution, DocumentationNode, FeedbackReceipt, KnowledgeStore, NewPattern, SharedKnowledgeStore,
    normalize_query, query_hash,
};
pub use similarity::{KeywordOverlapSimilarity, SimilarityStrategy};
