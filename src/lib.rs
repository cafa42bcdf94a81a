//! # Interview Harness
//!
//! A hybrid retrieval and structured-generation pipeline for an
//! interview-practice assistant.
//!
//! Interview Harness turns a candidate's job or answer into a
//! composite lexical+vector query against a document store, shapes the
//! retrieved material into a bounded random prompt context, and
//! extracts schema-shaped output (question sets, evaluation verdicts)
//! from a generative model, retrying on malformed responses.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Indexer  │──▶│ Document store │◀──│ Hybrid query  │
//! │ (ingest) │   │ (black box)    │   │ builder       │
//! └──────────┘   └───────┬───────┘   └───────▲───────┘
//!                        │                   │
//!                        ▼                   │
//!                  ┌──────────┐        ┌──────────┐
//!                  │ Retriever │──────▶│ Sampler  │
//!                  └──────────┘        └────┬─────┘
//!                                           ▼
//!                                    ┌──────────────┐
//!                                    │ Structured   │
//!                                    │ generation   │
//!                                    └──────────────┘
//! ```
//!
//! The document store, the embedding services, and the generative
//! model are external collaborators reached through traits; swap in
//! the in-memory store and stub models to run the whole pipeline in a
//! test.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | pipeline error taxonomy |
//! | [`embedding`] | embedding adapter, typed vector spaces |
//! | [`store`] | document store trait, HTTP and in-memory backends |
//! | [`query`] | hybrid ranking request construction |
//! | [`retrieve`] | ranked retrieval and group deduplication |
//! | [`sample`] | bounded random context sampling |
//! | [`schema`] | structured model-output shapes and coercion |
//! | [`generate`] | generative model adapter, bounded retry client |
//! | [`ingest`] | indexer write path |
//! | [`prompt`] | prompt assembly |
//! | [`pipeline`] | end-to-end question and evaluation flows |

pub mod config;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod retrieve;
pub mod sample;
pub mod schema;
pub mod store;
