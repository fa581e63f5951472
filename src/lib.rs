//! Membership Server Library
//!
//! Verifies voter identity documents, registers members and renders
//! membership cards. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `identifier`: EPIC number type and text search
//! - `extract`: text-layer-then-OCR identifier extraction from PDFs
//! - `ocr`: OCR provider chain (Tesseract CLI, Ollama)
//! - `card`: membership card rendering
//! - `verification`: token store for verified documents
//! - `db`: SQLite member registry
//! - `routes`: HTTP surface

pub mod card;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identifier;
pub mod ocr;
pub mod routes;
pub mod state;
pub mod verification;
