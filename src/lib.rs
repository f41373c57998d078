pub mod backend;
pub mod context;
pub mod defuse;
pub mod desugar;
pub mod diag;
pub mod driver;
pub mod elaborate;
pub mod interp;
pub mod lambda_lift;
pub mod lexer;
pub mod parse;
pub mod quote_lift;
pub mod scope;
pub mod tree;
pub mod types;
