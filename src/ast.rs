//! # Targeting Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and the Abstract Syntax Tree (AST) for the
//! targeting expression language: small boolean/arithmetic expressions that
//! decide whether a recipe applies to a client.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, identifiers, operations, filters, transforms)
//! - **[operators]** - Binary and unary operators
//!
//! ## Quick Start
//!
//! ```text
//! normandy.channel in ["beta", "nightly"] && normandy.userId|stableSample(0.1)
//! ```
//!
//! Matches one client in ten on the beta and nightly channels.
//!
//! ## Core Concepts
//!
//! ### Identifiers
//!
//! Bare names are looked up in the evaluation context; dotted chains walk
//! into nested objects. Missing keys resolve to `null` instead of failing,
//! so `missing.field == 3` is simply `false`.
//!
//! ### Filters
//!
//! `subject[predicate]` has two meanings:
//!
//! - If the predicate uses a **relative identifier** (leading dot), it is a
//!   per-element test: `addons[.active == true]`.
//! - Otherwise it is a subscript: `locales[0]`, `locales[-1]`, `prefs["a.b"]`.
//!
//! ### Transforms
//!
//! `subject|name(args...)` hands the subject and arguments to a function
//! supplied by the caller at evaluation time.
//!
//! ## Examples
//!
//! ```text
//! normandy.version >= 60 && normandy.locale == "en-US"
//! normandy.addons[.id == "shield@mozilla.org"][0].version
//! ["user", normandy.userId]|bucketSample(0, 500, 10000)
//! normandy.isFirstRun ? 1 : 0
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{BinOp, UnaryOp};
pub use tokens::{Punct, Token, TokenKind};
