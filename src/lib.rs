pub mod ir;
pub mod lexer;
pub mod reader;
pub mod validation;
