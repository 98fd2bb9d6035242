//! Backend tests
//!
//! `contract` holds checks every Backend implementation must pass; the other
//! modules run them against each implementation and add their own.

mod context_tests;
