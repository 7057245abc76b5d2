use std::collections::HashMap;

use crate::ast::visit::{self, VisitMut};
use crate::ast::{Expr, Module, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
    pub span: Span,
}

/// Comments keyed by the byte position of the token they precede, as the
/// host parser reports them. Only leading comments matter to the core.
#[derive(Debug, Default, Clone)]
pub struct CommentStore {
    leading: HashMap<u32, Vec<Comment>>,
}

impl CommentStore {
    pub fn add_leading(&mut self, pos: u32, comment: Comment) {
        self.leading.entry(pos).or_default().push(comment);
    }

    pub fn get_leading(&self, pos: u32) -> Option<&[Comment]> {
        self.leading.get(&pos).map(|c| c.as_slice())
    }

    /// Check for `/*#__PURE__*/` (or the `@` spelling) immediately before
    /// `pos`.
    pub fn has_pure(&self, pos: u32) -> bool {
        self.has_flag(pos, "PURE")
    }

    fn has_flag(&self, pos: u32, text: &str) -> bool {
        self.find_comment(pos, |c| {
            if c.kind == CommentKind::Block {
                if c.text.len() == (text.len() + 5)
                    && (c.text.starts_with("#__") || c.text.starts_with("@__"))
                    && c.text.ends_with("__")
                    && text == &c.text[3..c.text.len() - 2]
                {
                    return true;
                }
            }

            false
        })
    }

    fn find_comment<F>(&self, pos: u32, mut op: F) -> bool
    where
        F: FnMut(&Comment) -> bool,
    {
        let mut found = false;
        if let Some(cs) = self.leading.get(&pos) {
            for c in cs {
                found |= op(c);
                if found {
                    break;
                }
            }
        }

        found
    }
}

/// Marks calls and constructions annotated `/*#__PURE__*/` so later passes
/// never have to consult the comment store. Runs once per module at build
/// time.
pub fn stamp_pure_calls(module: &mut Module, comments: &CommentStore) {
    let mut stamper = PureStamper { comments };
    stamper.visit_mut_module(module);
}

struct PureStamper<'a> {
    comments: &'a CommentStore,
}

impl VisitMut for PureStamper<'_> {
    fn visit_mut_expr(&mut self, e: &mut Expr) {
        match e {
            Expr::Call(call) => {
                if self.comments.has_pure(call.span.lo) {
                    call.pure = true;
                }
            }
            Expr::New(new) => {
                if self.comments.has_pure(new.span.lo) {
                    new.pure = true;
                }
            }
            _ => {}
        }
        visit::walk_mut_expr(self, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Arg, CallExpr, Callee, ExprStmt, Ident, Stmt, DUMMY_SP};

    fn block(text: &str) -> Comment {
        Comment {
            kind: CommentKind::Block,
            text: text.to_string(),
            span: DUMMY_SP,
        }
    }

    #[test]
    fn test_pure_flag_matching() {
        let mut store = CommentStore::default();
        store.add_leading(10, block("#__PURE__"));
        store.add_leading(20, block("@__PURE__"));
        store.add_leading(30, block(" #__PURE__ "));
        store.add_leading(40, block("#__PURE"));
        store.add_leading(50, block("#__NOSIDEEFFECTS__"));
        store.add_leading(
            60,
            Comment {
                kind: CommentKind::Line,
                text: "#__PURE__".to_string(),
                span: DUMMY_SP,
            },
        );

        assert!(store.has_pure(10));
        assert!(store.has_pure(20));
        // Padding, truncation, other flags and line comments never match.
        assert!(!store.has_pure(30));
        assert!(!store.has_pure(40));
        assert!(!store.has_pure(50));
        assert!(!store.has_pure(60));
        assert!(!store.has_pure(70));
    }

    #[test]
    fn test_stamp_pure_calls() {
        let call = |lo: u32| {
            Stmt::Expr(ExprStmt {
                expr: Expr::Call(CallExpr {
                    callee: Callee::Expr(Box::new(Expr::Ident(Ident::new(
                        "f",
                        Span { lo, hi: lo + 1 },
                    )))),
                    args: vec![Arg::plain(Expr::Ident(Ident::new("x", DUMMY_SP)))],
                    pure: false,
                    span: Span { lo, hi: lo + 4 },
                }),
                span: Span { lo, hi: lo + 4 },
            })
        };
        let mut module = Module {
            stmts: vec![call(0), call(100)],
            span: DUMMY_SP,
        };
        let mut comments = CommentStore::default();
        comments.add_leading(100, block("#__PURE__"));

        stamp_pure_calls(&mut module, &comments);

        let pure_flags: Vec<bool> = module
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Expr(ExprStmt {
                    expr: Expr::Call(c),
                    ..
                }) => c.pure,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(pure_flags, vec![false, true]);
    }
}
