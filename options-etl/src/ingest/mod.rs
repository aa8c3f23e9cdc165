//! Options-chain ingestion: fetch, skip policy, price, store.

pub mod pipeline;

pub use pipeline::{
    price_contract, time_to_maturity, FailedInsert, IngestError, IngestReport, Ingestor,
    SkippedRecord,
};
