//! Helpers for writing tests against the pipeline without a real parser or
//! filesystem: hand-built statement trees and an in-memory host.

/// Terse constructors for statement trees. Spans are dummies unless a test
/// needs real ones.
pub mod ast {
    use crate::ast::*;

    pub fn module(stmts: Vec<Stmt>) -> Module {
        Module {
            stmts,
            span: DUMMY_SP,
        }
    }

    pub fn ident(name: &str) -> Ident {
        Ident::new(name, DUMMY_SP)
    }

    pub fn id_expr(name: &str) -> Expr {
        Expr::Ident(ident(name))
    }

    pub fn num(value: f64) -> Expr {
        Expr::Lit(Lit::Num(JsNumber(value)))
    }

    pub fn str_lit(value: &str) -> Expr {
        Expr::Lit(Lit::Str(value.to_string()))
    }

    pub fn bool_lit(value: bool) -> Expr {
        Expr::Lit(Lit::Bool(value))
    }

    pub fn null_lit() -> Expr {
        Expr::Lit(Lit::Null)
    }

    pub fn bigint_lit(value: i64) -> Expr {
        Expr::Lit(Lit::BigInt(num_bigint::BigInt::from(value)))
    }

    pub fn tpl(quasis: &[&str], exprs: Vec<Expr>) -> Expr {
        Expr::Tpl(Tpl {
            quasis: quasis.iter().map(|q| q.to_string()).collect(),
            exprs,
            span: DUMMY_SP,
        })
    }

    pub fn un(op: UnaryOp, arg: Expr) -> Expr {
        Expr::Unary(UnaryExpr {
            op,
            arg: Box::new(arg),
            span: DUMMY_SP,
        })
    }

    pub fn typeof_of(arg: Expr) -> Expr {
        un(UnaryOp::TypeOf, arg)
    }

    pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Bin(BinExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: DUMMY_SP,
        })
    }

    pub fn cond(test: Expr, cons: Expr, alt: Expr) -> Expr {
        Expr::Cond(CondExpr {
            test: Box::new(test),
            cons: Box::new(cons),
            alt: Box::new(alt),
            span: DUMMY_SP,
        })
    }

    pub fn seq(exprs: Vec<Expr>) -> Expr {
        Expr::Seq(SeqExpr {
            exprs,
            span: DUMMY_SP,
        })
    }

    pub fn assign(target: Ident, value: Expr) -> Expr {
        Expr::Assign(AssignExpr {
            op: None,
            target: AssignTarget::Ident(target),
            value: Box::new(value),
            span: DUMMY_SP,
        })
    }

    pub fn member(obj: Expr, prop: &str) -> Expr {
        Expr::Member(member_expr(obj, prop))
    }

    pub fn member_expr(obj: Expr, prop: &str) -> MemberExpr {
        MemberExpr {
            obj: Box::new(obj),
            prop: MemberProp::Ident(prop.to_string()),
            span: DUMMY_SP,
        }
    }

    pub fn computed_member(obj: Expr, prop: Expr) -> MemberExpr {
        MemberExpr {
            obj: Box::new(obj),
            prop: MemberProp::Computed(Box::new(prop)),
            span: DUMMY_SP,
        }
    }

    pub fn assign_to(target: MemberExpr, value: Expr) -> Expr {
        Expr::Assign(AssignExpr {
            op: None,
            target: AssignTarget::Member(target),
            value: Box::new(value),
            span: DUMMY_SP,
        })
    }

    pub fn object_lit(props: Vec<(&str, Expr)>) -> Expr {
        Expr::Object(ObjectLit {
            props: props
                .into_iter()
                .map(|(key, value)| Prop::KeyValue {
                    key: PropName::Ident(key.to_string()),
                    value,
                })
                .collect(),
            span: DUMMY_SP,
        })
    }

    pub fn call_expr(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(CallExpr {
            callee: Callee::Expr(Box::new(callee)),
            args: args.into_iter().map(Arg::plain).collect(),
            pure: false,
            span: DUMMY_SP,
        })
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        call_expr(id_expr(name), args)
    }

    pub fn pure_call(name: &str, args: Vec<Expr>) -> Expr {
        match call(name, args) {
            Expr::Call(mut c) => {
                c.pure = true;
                Expr::Call(c)
            }
            _ => unreachable!(),
        }
    }

    pub fn spread_call(name: &str, arg: Expr) -> Expr {
        Expr::Call(CallExpr {
            callee: Callee::Expr(Box::new(id_expr(name))),
            args: vec![Arg {
                spread: true,
                expr: arg,
            }],
            pure: false,
            span: DUMMY_SP,
        })
    }

    pub fn dynamic_import(source: &str) -> Expr {
        Expr::Call(CallExpr {
            callee: Callee::Import,
            args: vec![Arg::plain(str_lit(source))],
            pure: false,
            span: DUMMY_SP,
        })
    }

    pub fn new_expr(name: &str, args: Vec<Expr>) -> Expr {
        Expr::New(NewExpr {
            callee: Box::new(id_expr(name)),
            args: args.into_iter().map(Arg::plain).collect(),
            pure: false,
            span: DUMMY_SP,
        })
    }

    /// `new Worker(new URL("<source>", import.meta.url))`.
    pub fn new_worker(source: &str) -> Expr {
        new_expr(
            "Worker",
            vec![new_expr(
                "URL",
                vec![str_lit(source), member(Expr::MetaProp(DUMMY_SP), "url")],
            )],
        )
    }

    pub fn expr_stmt(expr: Expr) -> Stmt {
        Stmt::Expr(ExprStmt {
            expr,
            span: DUMMY_SP,
        })
    }

    pub fn block_stmt(stmts: Vec<Stmt>) -> Stmt {
        Stmt::Block(BlockStmt {
            stmts,
            span: DUMMY_SP,
        })
    }

    pub fn if_stmt(test: Expr, cons: Stmt, alt: Option<Stmt>) -> Stmt {
        Stmt::If(IfStmt {
            test,
            cons: Box::new(cons),
            alt: alt.map(Box::new),
            span: DUMMY_SP,
        })
    }

    pub fn return_stmt(arg: Option<Expr>) -> Stmt {
        Stmt::Return(ReturnStmt {
            arg,
            span: DUMMY_SP,
        })
    }

    pub fn throw_stmt(arg: Expr) -> Stmt {
        Stmt::Throw(ThrowStmt {
            arg,
            span: DUMMY_SP,
        })
    }

    pub fn var_decl(kind: VarDeclKind, name: &str, init: Option<Expr>) -> Stmt {
        Stmt::Decl(var_declaration(kind, name, init))
    }

    pub fn var_declaration(kind: VarDeclKind, name: &str, init: Option<Expr>) -> Decl {
        Decl::Var(VarDecl {
            kind,
            decls: vec![VarDeclarator {
                name: Pat::Ident(ident(name)),
                init,
                span: DUMMY_SP,
            }],
            span: DUMMY_SP,
        })
    }

    pub fn const_decl(name: &str, init: Expr) -> Stmt {
        var_decl(VarDeclKind::Const, name, Some(init))
    }

    pub fn function(params: &[&str], body: Vec<Stmt>) -> Function {
        Function {
            params: params.iter().map(|p| Pat::Ident(ident(p))).collect(),
            body: BlockStmt {
                stmts: body,
                span: DUMMY_SP,
            },
            is_async: false,
            is_generator: false,
            span: DUMMY_SP,
        }
    }

    pub fn fn_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
        Stmt::Decl(Decl::Fn(FnDecl {
            ident: ident(name),
            function: function(params, body),
            span: DUMMY_SP,
        }))
    }

    pub fn import_named(source: &str, specs: &[(&str, &str)]) -> Stmt {
        Stmt::Import(ImportDecl {
            specifiers: specs
                .iter()
                .map(|(imported, local)| ImportSpecifier::Named {
                    local: ident(local),
                    imported: if imported == local {
                        None
                    } else {
                        Some(imported.to_string())
                    },
                })
                .collect(),
            source: source.to_string(),
            span: DUMMY_SP,
        })
    }

    pub fn import_default(source: &str, local: &str) -> Stmt {
        Stmt::Import(ImportDecl {
            specifiers: vec![ImportSpecifier::Default {
                local: ident(local),
            }],
            source: source.to_string(),
            span: DUMMY_SP,
        })
    }

    pub fn import_star(source: &str, local: &str) -> Stmt {
        Stmt::Import(ImportDecl {
            specifiers: vec![ImportSpecifier::Namespace {
                local: ident(local),
            }],
            source: source.to_string(),
            span: DUMMY_SP,
        })
    }

    pub fn import_bare(source: &str) -> Stmt {
        Stmt::Import(ImportDecl {
            specifiers: vec![],
            source: source.to_string(),
            span: DUMMY_SP,
        })
    }

    pub fn export_const(name: &str, init: Expr) -> Stmt {
        Stmt::ExportDecl(ExportDecl {
            decl: var_declaration(VarDeclKind::Const, name, Some(init)),
            span: DUMMY_SP,
        })
    }

    pub fn export_fn(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
        Stmt::ExportDecl(ExportDecl {
            decl: Decl::Fn(FnDecl {
                ident: ident(name),
                function: function(params, body),
                span: DUMMY_SP,
            }),
            span: DUMMY_SP,
        })
    }

    pub fn export_named(specs: &[(&str, &str)]) -> Stmt {
        Stmt::ExportNamed(NamedExport {
            specifiers: named_export_specs(specs),
            source: None,
            span: DUMMY_SP,
        })
    }

    pub fn reexport_named(source: &str, specs: &[(&str, &str)]) -> Stmt {
        Stmt::ExportNamed(NamedExport {
            specifiers: named_export_specs(specs),
            source: Some(source.to_string()),
            span: DUMMY_SP,
        })
    }

    fn named_export_specs(specs: &[(&str, &str)]) -> Vec<ExportSpecifier> {
        specs
            .iter()
            .map(|(orig, exported)| ExportSpecifier {
                orig: ident(orig),
                exported: if orig == exported {
                    None
                } else {
                    Some(exported.to_string())
                },
                span: DUMMY_SP,
            })
            .collect()
    }

    pub fn export_default_expr(expr: Expr) -> Stmt {
        Stmt::ExportDefault(ExportDefault {
            decl: DefaultDecl::Expr(expr),
            symbol: None,
            span: DUMMY_SP,
        })
    }

    pub fn export_star(source: &str) -> Stmt {
        Stmt::ExportStar(ExportStar {
            source: source.to_string(),
            alias: None,
            span: DUMMY_SP,
        })
    }

    pub fn export_star_as(source: &str, alias: &str) -> Stmt {
        Stmt::ExportStar(ExportStar {
            source: source.to_string(),
            alias: Some(ident(alias)),
            span: DUMMY_SP,
        })
    }
}

/// An in-memory host over hand-built statement trees. Specifiers resolve by
/// exact id match; the loader hands the id back as the "source" and the
/// parser looks the tree up by path.
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::ast;
    use crate::ast::comments::CommentStore;
    use crate::compiler::Compiler;
    use crate::config::Config;
    use crate::error::ResolveError;
    use crate::host::{
        LoadError, LoadedModule, Loader, ParseError, ParsedSource, Parser, ResolvedId, Resolver,
    };
    use crate::module::{ModuleId, ModuleKind, PackageInfo, ResolveKind};

    pub struct MemoryModule {
        pub ast: ast::Module,
        pub comments: CommentStore,
        pub kind: ModuleKind,
        pub package: Option<PackageInfo>,
    }

    #[derive(Default)]
    pub struct MemoryHost {
        modules: HashMap<String, MemoryModule>,
    }

    impl MemoryHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add(&mut self, id: &str, stmts: Vec<ast::Stmt>) {
            self.add_module(
                id,
                MemoryModule {
                    ast: super::ast::module(stmts),
                    comments: CommentStore::default(),
                    kind: ModuleKind::Esm,
                    package: None,
                },
            );
        }

        /// Leaf module of the given kind (JSON, asset).
        pub fn add_kind(&mut self, id: &str, kind: ModuleKind) {
            self.add_module(
                id,
                MemoryModule {
                    ast: ast::Module::default(),
                    comments: CommentStore::default(),
                    kind,
                    package: None,
                },
            );
        }

        pub fn add_with_package(&mut self, id: &str, stmts: Vec<ast::Stmt>, package: PackageInfo) {
            self.add_module(
                id,
                MemoryModule {
                    ast: super::ast::module(stmts),
                    comments: CommentStore::default(),
                    kind: ModuleKind::Esm,
                    package: Some(package),
                },
            );
        }

        pub fn add_with_comments(&mut self, id: &str, stmts: Vec<ast::Stmt>, comments: CommentStore) {
            self.add_module(
                id,
                MemoryModule {
                    ast: super::ast::module(stmts),
                    comments,
                    kind: ModuleKind::Esm,
                    package: None,
                },
            );
        }

        pub fn add_module(&mut self, id: &str, module: MemoryModule) {
            self.modules.insert(id.to_string(), module);
        }
    }

    impl Parser for MemoryHost {
        fn parse(&self, _source: &str, path: &str) -> Result<ParsedSource, ParseError> {
            let module = self.modules.get(path).ok_or_else(|| ParseError {
                path: path.to_string(),
                message: "no fixture".to_string(),
            })?;
            Ok(ParsedSource {
                module: module.ast.clone(),
                comments: module.comments.clone(),
            })
        }
    }

    impl Resolver for MemoryHost {
        fn resolve(
            &self,
            specifier: &str,
            importer: Option<&ModuleId>,
            _kind: ResolveKind,
        ) -> Result<ResolvedId, ResolveError> {
            if self.modules.contains_key(specifier) {
                Ok(ResolvedId::new(specifier))
            } else {
                Err(ResolveError {
                    specifier: specifier.to_string(),
                    importer: importer
                        .map(|i| i.id.clone())
                        .unwrap_or_else(|| "<entry>".to_string()),
                })
            }
        }
    }

    impl Loader for MemoryHost {
        fn load(&self, id: &ModuleId) -> Result<LoadedModule, LoadError> {
            let module = self.modules.get(&id.id).ok_or_else(|| LoadError {
                id: id.id.clone(),
                message: "no fixture".to_string(),
            })?;
            Ok(LoadedModule {
                source: id.id.clone(),
                kind: module.kind,
                package: module.package.clone(),
            })
        }
    }

    pub fn compiler_with(host: MemoryHost, entries: &[&str]) -> Compiler {
        compiler_with_config(host, Config::default(), entries)
    }

    pub fn compiler_with_config(host: MemoryHost, mut config: Config, entries: &[&str]) -> Compiler {
        for entry in entries {
            config.entry.insert((*entry).to_string(), (*entry).to_string());
        }
        let host = Arc::new(host);
        Compiler::new(config, host.clone(), host.clone(), host)
    }
}
