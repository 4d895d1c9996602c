//! Core library for the pole-mapper command line application.
//!
//! Survey rows pass through four stages: the row classifier
//! ([`pole::mapper::classify`]) resolves cells to attachment categories, the
//! aggregator ([`pole::mapper::aggregate`]) merges rows into poles and
//! summarizes their attachments ([`pole::mapper::attachments`]), the route
//! reconciler ([`pole::mapper::route`]) orders the poles into spans, and the
//! output builder ([`pole::mapper::output`]) emits the records projected onto
//! the consumer template by [`pole::mapper::projection`]. Spreadsheet,
//! configuration and geocoding adapters live under [`pole::mapper::io`], the
//! end-to-end orchestration under [`pole::mapper::pipeline`].

pub mod pole;

pub use pole::mapper::{
    Result, ToolError, aggregate, attachments, classify, config, error, io, measure, model, notes,
    output, pipeline, projection, report, route, scid,
};
