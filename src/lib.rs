//! podreader - speaker-labeled, translated documents from interview transcripts.
//!
//! A raw transcript is split into word-aligned chunks, each chunk is labeled
//! (and translated) by a generative backend, and the reassembled text must
//! pass a completeness gate before it is rendered. Raw and labeled
//! transcripts are cached per source so reruns skip finished work.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod label;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod source;
