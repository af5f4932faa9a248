//! Syntax domain - the typed AST and identifier rules

pub mod ast;
pub mod ident;

pub use ast::{
    Arg, CallExpr, CompKind, Expr, Handler, KwSplat, KwValue, PackElem, PackExpr, PosArg,
    ReturnValue, StarArg, Stmt, TextExpr,
};
pub use ident::is_valid_name;
