//! Structured parsers for manifest grammars that are worth more than a
//! line-oriented regex scan.

pub mod hcl;
