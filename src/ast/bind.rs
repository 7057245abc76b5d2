//! Scope analysis. Binds every identifier in a module to a [`Symbol`] or
//! leaves it unbound, records reference sites and reassignments, and flags
//! the facts later passes rely on (free-name writes, presence of `eval`).
//!
//! Binding is idempotent: it overwrites whatever symbols a previous run
//! stamped, so callers may re-bind after rewriting a module body.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Import,
    Param,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared directly in module scope. Only these can be exported or
    /// inlined across modules.
    pub top_level: bool,
    /// Written to after its declaration completes. Initializers do not
    /// count.
    pub assigned: bool,
    pub refs: Vec<Span>,
    pub decl_span: Span,
    /// Filled in by the shaker once liveness is known.
    pub live: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    free_assigned: HashSet<String>,
    has_eval: bool,
}

impl SymbolTable {
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether an unbound name is written to anywhere in the module. An
    /// unbound `typeof` guard may only fold when this is false.
    pub fn is_free_name_assigned(&self, name: &str) -> bool {
        self.free_assigned.contains(name)
    }

    /// Whether the module mentions `eval` at all. Constant inlining into
    /// such a module is declined.
    pub fn has_eval(&self) -> bool {
        self.has_eval
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, top_level: bool, span: Span) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            top_level,
            assigned: false,
            refs: Vec::new(),
            decl_span: span,
            live: false,
        });
        id
    }
}

pub fn bind_module(module: &mut Module) -> SymbolTable {
    let mut binder = Binder {
        table: SymbolTable::default(),
        scopes: vec![Scope::new(ScopeKind::Module)],
    };
    binder.declare_module_scope(&mut module.stmts);
    for stmt in &mut module.stmts {
        binder.bind_stmt(stmt);
    }
    binder.table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Function,
    Block,
}

struct Scope {
    kind: ScopeKind,
    names: HashMap<String, SymbolId>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            names: HashMap::new(),
        }
    }
}

struct Binder {
    table: SymbolTable,
    scopes: Vec<Scope>,
}

impl Binder {
    fn in_module_scope(&self) -> bool {
        self.scopes
            .last()
            .map(|s| s.kind == ScopeKind::Module)
            .unwrap_or(false)
    }

    fn declare(&mut self, ident: &mut Ident, kind: SymbolKind) {
        let top_level = self.in_module_scope();
        // Redeclaration in the same scope (`var x; var x`) reuses the first
        // symbol.
        let existing = self
            .scopes
            .last()
            .and_then(|s| s.names.get(&ident.sym))
            .copied();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.table.declare(&ident.sym, kind, top_level, ident.span);
                if let Some(scope) = self.scopes.last_mut() {
                    scope.names.insert(ident.sym.clone(), id);
                }
                id
            }
        };
        ident.symbol = Some(id);
    }

    fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.names.get(name).copied())
    }

    fn reference(&mut self, ident: &mut Ident) {
        if ident.sym == "eval" {
            self.table.has_eval = true;
        }
        match self.resolve(&ident.sym) {
            Some(id) => {
                ident.symbol = Some(id);
                self.table.symbol_mut(id).refs.push(ident.span);
            }
            None => ident.symbol = None,
        }
    }

    fn mark_assigned(&mut self, ident: &Ident) {
        match ident.symbol {
            Some(id) => self.table.symbol_mut(id).assigned = true,
            None => {
                self.table.free_assigned.insert(ident.sym.clone());
            }
        }
    }

    /// Declares everything visible throughout module scope before any
    /// reference is resolved: imports, lexical declarations, function and
    /// class declarations, and `var`s hoisted out of nested blocks.
    fn declare_module_scope(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts.iter_mut() {
            match stmt {
                Stmt::Import(import) => {
                    for spec in &mut import.specifiers {
                        match spec {
                            ImportSpecifier::Named { local, .. }
                            | ImportSpecifier::Default { local }
                            | ImportSpecifier::Namespace { local } => {
                                self.declare(local, SymbolKind::Import)
                            }
                        }
                    }
                }
                Stmt::Decl(decl) | Stmt::ExportDecl(ExportDecl { decl, .. }) => {
                    self.declare_decl_names(decl)
                }
                Stmt::ExportDefault(export) => {
                    export.symbol = match &mut export.decl {
                        DefaultDecl::Fn(FnExpr {
                            ident: Some(ident), ..
                        }) => {
                            self.declare(ident, SymbolKind::Function);
                            ident.symbol
                        }
                        DefaultDecl::Class(ClassExpr {
                            ident: Some(ident), ..
                        }) => {
                            self.declare(ident, SymbolKind::Class);
                            ident.symbol
                        }
                        // Anonymous defaults cannot be referenced, so the
                        // symbol lives only in the table, never in scope.
                        _ => Some(self.table.declare(
                            "default",
                            SymbolKind::Const,
                            true,
                            export.span,
                        )),
                    };
                }
                _ => {}
            }
        }
        self.hoist_vars(stmts);
    }

    fn declare_decl_names(&mut self, decl: &mut Decl) {
        match decl {
            Decl::Var(var) => {
                let kind = match var.kind {
                    VarDeclKind::Var => SymbolKind::Var,
                    VarDeclKind::Let => SymbolKind::Let,
                    VarDeclKind::Const => SymbolKind::Const,
                };
                for declarator in &mut var.decls {
                    self.declare_pat(&mut declarator.name, kind);
                }
            }
            Decl::Fn(f) => self.declare(&mut f.ident, SymbolKind::Function),
            Decl::Class(c) => self.declare(&mut c.ident, SymbolKind::Class),
        }
    }

    fn declare_pat(&mut self, pat: &mut Pat, kind: SymbolKind) {
        match pat {
            Pat::Ident(ident) => self.declare(ident, kind),
            Pat::Assign(assign) => self.declare_pat(&mut assign.pat, kind),
            Pat::Rest(rest) => self.declare_pat(rest, kind),
            Pat::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.declare_pat(elem, kind);
                }
            }
            Pat::Object(object) => {
                for prop in &mut object.props {
                    match &mut prop.value {
                        Some(value) => self.declare_pat(value, kind),
                        // Shorthand `{ a }` binds the key name.
                        None => {
                            if let PropName::Ident(name) = &prop.key {
                                let mut ident = Ident::new(name.clone(), prop.span);
                                self.declare(&mut ident, kind);
                                prop.value = Some(Pat::Ident(ident));
                            }
                        }
                    }
                }
                if let Some(rest) = &mut object.rest {
                    self.declare_pat(rest, kind);
                }
            }
        }
    }

    /// `var` declarations reach the nearest function or module scope no
    /// matter how deeply they sit in blocks. Does not descend into nested
    /// functions.
    fn hoist_vars(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts.iter_mut() {
            match stmt {
                Stmt::Decl(Decl::Var(var)) | Stmt::ExportDecl(ExportDecl {
                    decl: Decl::Var(var),
                    ..
                }) if var.kind == VarDeclKind::Var => {
                    for declarator in &mut var.decls {
                        self.declare_pat(&mut declarator.name, SymbolKind::Var);
                    }
                }
                Stmt::Block(block) => self.hoist_vars(&mut block.stmts),
                Stmt::If(stmt) => {
                    self.hoist_vars(std::slice::from_mut(stmt.cons.as_mut()));
                    if let Some(alt) = &mut stmt.alt {
                        self.hoist_vars(std::slice::from_mut(alt.as_mut()));
                    }
                }
                Stmt::While(stmt) => self.hoist_vars(std::slice::from_mut(stmt.body.as_mut())),
                Stmt::For(stmt) => {
                    if let Some(ForInit::Var(var)) = &mut stmt.init {
                        if var.kind == VarDeclKind::Var {
                            for declarator in &mut var.decls {
                                self.declare_pat(&mut declarator.name, SymbolKind::Var);
                            }
                        }
                    }
                    self.hoist_vars(std::slice::from_mut(stmt.body.as_mut()));
                }
                _ => {}
            }
        }
    }

    /// Lexical declarations of a nested block, declared on entering it.
    fn declare_block_scope(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts.iter_mut() {
            match stmt {
                Stmt::Decl(Decl::Var(var)) if var.kind != VarDeclKind::Var => {
                    let kind = match var.kind {
                        VarDeclKind::Let => SymbolKind::Let,
                        _ => SymbolKind::Const,
                    };
                    for declarator in &mut var.decls {
                        self.declare_pat(&mut declarator.name, kind);
                    }
                }
                Stmt::Decl(Decl::Fn(f)) => self.declare(&mut f.ident, SymbolKind::Function),
                Stmt::Decl(Decl::Class(c)) => self.declare(&mut c.ident, SymbolKind::Class),
                _ => {}
            }
        }
    }

    fn bind_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Import(import) => {
                // Locals were declared up front; nothing to resolve.
                for spec in &mut import.specifiers {
                    match spec {
                        ImportSpecifier::Named { local, .. }
                        | ImportSpecifier::Default { local }
                        | ImportSpecifier::Namespace { local } => {
                            debug_assert!(local.symbol.is_some());
                        }
                    }
                }
            }
            Stmt::ExportDecl(export) => self.bind_decl(&mut export.decl),
            Stmt::ExportNamed(export) => {
                // `export { a as b } from "m"` names bindings of the source
                // module, not locals.
                if export.source.is_none() {
                    for spec in &mut export.specifiers {
                        self.reference(&mut spec.orig);
                    }
                }
            }
            Stmt::ExportDefault(export) => match &mut export.decl {
                DefaultDecl::Fn(f) => self.bind_function(&mut f.function),
                DefaultDecl::Class(c) => self.bind_class(&mut c.class),
                DefaultDecl::Expr(e) => self.bind_expr(e),
            },
            Stmt::ExportStar(_) => {}
            Stmt::Decl(decl) => self.bind_decl(decl),
            Stmt::Expr(stmt) => self.bind_expr(&mut stmt.expr),
            Stmt::Block(block) => {
                self.scopes.push(Scope::new(ScopeKind::Block));
                self.declare_block_scope(&mut block.stmts);
                for stmt in &mut block.stmts {
                    self.bind_stmt(stmt);
                }
                self.scopes.pop();
            }
            Stmt::If(stmt) => {
                self.bind_expr(&mut stmt.test);
                self.bind_stmt(&mut stmt.cons);
                if let Some(alt) = &mut stmt.alt {
                    self.bind_stmt(alt);
                }
            }
            Stmt::While(stmt) => {
                self.bind_expr(&mut stmt.test);
                self.bind_stmt(&mut stmt.body);
            }
            Stmt::For(stmt) => {
                self.scopes.push(Scope::new(ScopeKind::Block));
                match &mut stmt.init {
                    Some(ForInit::Var(var)) => {
                        if var.kind != VarDeclKind::Var {
                            let kind = match var.kind {
                                VarDeclKind::Let => SymbolKind::Let,
                                _ => SymbolKind::Const,
                            };
                            for declarator in &mut var.decls {
                                self.declare_pat(&mut declarator.name, kind);
                            }
                        }
                        for declarator in &mut var.decls {
                            self.bind_pat_decl(&mut declarator.name);
                            if let Some(init) = &mut declarator.init {
                                self.bind_expr(init);
                            }
                        }
                    }
                    Some(ForInit::Expr(e)) => self.bind_expr(e),
                    None => {}
                }
                if let Some(test) = &mut stmt.test {
                    self.bind_expr(test);
                }
                if let Some(update) = &mut stmt.update {
                    self.bind_expr(update);
                }
                self.bind_stmt(&mut stmt.body);
                self.scopes.pop();
            }
            Stmt::Return(stmt) => {
                if let Some(arg) = &mut stmt.arg {
                    self.bind_expr(arg);
                }
            }
            Stmt::Throw(stmt) => self.bind_expr(&mut stmt.arg),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
        }
    }

    fn bind_decl(&mut self, decl: &mut Decl) {
        match decl {
            Decl::Var(var) => {
                for declarator in &mut var.decls {
                    self.bind_pat_decl(&mut declarator.name);
                    if let Some(init) = &mut declarator.init {
                        self.bind_expr(init);
                    }
                }
            }
            Decl::Fn(f) => {
                debug_assert!(f.ident.symbol.is_some());
                self.bind_function(&mut f.function);
            }
            Decl::Class(c) => {
                debug_assert!(c.ident.symbol.is_some());
                self.bind_class(&mut c.class);
            }
        }
    }

    /// Resolves declaration-position pattern idents to the symbols the
    /// declare pass created, and binds default-value expressions.
    fn bind_pat_decl(&mut self, pat: &mut Pat) {
        match pat {
            Pat::Ident(ident) => {
                ident.symbol = self.resolve(&ident.sym);
            }
            Pat::Assign(assign) => {
                self.bind_pat_decl(&mut assign.pat);
                self.bind_expr(&mut assign.default);
            }
            Pat::Rest(rest) => self.bind_pat_decl(rest),
            Pat::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.bind_pat_decl(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &mut object.props {
                    if let PropName::Computed(key) = &mut prop.key {
                        self.bind_expr(key);
                    }
                    if let Some(value) = &mut prop.value {
                        self.bind_pat_decl(value);
                    }
                }
                if let Some(rest) = &mut object.rest {
                    self.bind_pat_decl(rest);
                }
            }
        }
    }

    fn bind_function(&mut self, function: &mut Function) {
        self.scopes.push(Scope::new(ScopeKind::Function));
        for param in &mut function.params {
            self.declare_pat(param, SymbolKind::Param);
        }
        for param in &mut function.params {
            self.bind_pat_decl(param);
        }
        self.hoist_vars(&mut function.body.stmts);
        self.declare_block_scope(&mut function.body.stmts);
        for stmt in &mut function.body.stmts {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn bind_class(&mut self, class: &mut Class) {
        if let Some(super_class) = &mut class.super_class {
            self.bind_expr(super_class);
        }
        for member in &mut class.members {
            if let PropName::Computed(key) = &mut member.key {
                self.bind_expr(key);
            }
            match &mut member.body {
                ClassMemberBody::Method(function) => self.bind_function(function),
                ClassMemberBody::Property(Some(value)) => self.bind_expr(value),
                ClassMemberBody::Property(None) => {}
            }
        }
    }

    fn bind_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Ident(ident) => self.reference(ident),
            Expr::Lit(_) | Expr::MetaProp(_) => {}
            Expr::Tpl(tpl) => {
                for expr in &mut tpl.exprs {
                    self.bind_expr(expr);
                }
            }
            Expr::Unary(unary) => self.bind_expr(&mut unary.arg),
            Expr::Update(update) => {
                self.bind_expr(&mut update.arg);
                if let Expr::Ident(ident) = update.arg.as_ref() {
                    self.mark_assigned(ident);
                }
            }
            Expr::Bin(bin) => {
                self.bind_expr(&mut bin.left);
                self.bind_expr(&mut bin.right);
            }
            Expr::Cond(cond) => {
                self.bind_expr(&mut cond.test);
                self.bind_expr(&mut cond.cons);
                self.bind_expr(&mut cond.alt);
            }
            Expr::Assign(assign) => {
                match &mut assign.target {
                    AssignTarget::Ident(ident) => {
                        self.reference(ident);
                        self.mark_assigned(ident);
                    }
                    AssignTarget::Member(member) => self.bind_member(member),
                    AssignTarget::Pat(pat) => self.bind_assign_target_pat(pat),
                }
                self.bind_expr(&mut assign.value);
            }
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &mut call.callee {
                    self.bind_expr(callee);
                }
                for arg in &mut call.args {
                    self.bind_expr(&mut arg.expr);
                }
            }
            Expr::New(new) => {
                self.bind_expr(&mut new.callee);
                for arg in &mut new.args {
                    self.bind_expr(&mut arg.expr);
                }
            }
            Expr::Member(member) => self.bind_member(member),
            Expr::Seq(seq) => {
                for expr in &mut seq.exprs {
                    self.bind_expr(expr);
                }
            }
            Expr::Fn(f) => {
                // The expression's own name is visible inside it only.
                self.scopes.push(Scope::new(ScopeKind::Block));
                if let Some(ident) = &mut f.ident {
                    self.declare(ident, SymbolKind::Function);
                }
                self.bind_function(&mut f.function);
                self.scopes.pop();
            }
            Expr::Arrow(arrow) => {
                self.scopes.push(Scope::new(ScopeKind::Function));
                for param in &mut arrow.params {
                    self.declare_pat(param, SymbolKind::Param);
                }
                for param in &mut arrow.params {
                    self.bind_pat_decl(param);
                }
                match arrow.body.as_mut() {
                    ArrowBody::Block(block) => {
                        self.hoist_vars(&mut block.stmts);
                        self.declare_block_scope(&mut block.stmts);
                        for stmt in &mut block.stmts {
                            self.bind_stmt(stmt);
                        }
                    }
                    ArrowBody::Expr(expr) => self.bind_expr(expr),
                }
                self.scopes.pop();
            }
            Expr::Object(object) => {
                for prop in &mut object.props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            if let PropName::Computed(key) = key {
                                self.bind_expr(key);
                            }
                            self.bind_expr(value);
                        }
                        Prop::Shorthand(ident) => self.reference(ident),
                        Prop::Method { key, function } => {
                            if let PropName::Computed(key) = key {
                                self.bind_expr(key);
                            }
                            self.bind_function(function);
                        }
                        Prop::Spread(expr) => self.bind_expr(expr),
                    }
                }
            }
            Expr::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.bind_expr(&mut elem.expr);
                }
            }
            Expr::Class(class) => {
                self.scopes.push(Scope::new(ScopeKind::Block));
                if let Some(ident) = &mut class.ident {
                    self.declare(ident, SymbolKind::Class);
                }
                self.bind_class(&mut class.class);
                self.scopes.pop();
            }
        }
    }

    fn bind_member(&mut self, member: &mut MemberExpr) {
        self.bind_expr(&mut member.obj);
        if let MemberProp::Computed(prop) = &mut member.prop {
            self.bind_expr(prop);
        }
    }

    /// Destructuring assignment targets are references, and every leaf
    /// ident is written to.
    fn bind_assign_target_pat(&mut self, pat: &mut Pat) {
        match pat {
            Pat::Ident(ident) => {
                self.reference(ident);
                self.mark_assigned(ident);
            }
            Pat::Assign(assign) => {
                self.bind_assign_target_pat(&mut assign.pat);
                self.bind_expr(&mut assign.default);
            }
            Pat::Rest(rest) => self.bind_assign_target_pat(rest),
            Pat::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.bind_assign_target_pat(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &mut object.props {
                    if let PropName::Computed(key) = &mut prop.key {
                        self.bind_expr(key);
                    }
                    if let Some(value) = &mut prop.value {
                        self.bind_assign_target_pat(value);
                    }
                }
                if let Some(rest) = &mut object.rest {
                    self.bind_assign_target_pat(rest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::ast::*;

    fn bound(module: &mut Module) -> SymbolTable {
        bind_module(module)
    }

    fn top_level_symbol<'a>(table: &'a SymbolTable, name: &str) -> &'a Symbol {
        table
            .iter()
            .map(|(_, s)| s)
            .find(|s| s.top_level && s.name == name)
            .unwrap()
    }

    #[test]
    fn test_binds_imports_and_references() {
        let mut m = module(vec![
            import_named("./a.js", &[("value", "value")]),
            expr_stmt(call("use", vec![id_expr("value")])),
        ]);
        let table = bound(&mut m);

        let value = top_level_symbol(&table, "value");
        assert_eq!(value.kind, SymbolKind::Import);
        assert_eq!(value.refs.len(), 1);
        // `use` has no binding anywhere.
        assert!(table.iter().all(|(_, s)| s.name != "use"));
    }

    #[test]
    fn test_var_hoisting_out_of_blocks() {
        let mut m = module(vec![
            expr_stmt(id_expr("x")),
            block_stmt(vec![var_decl(VarDeclKind::Var, "x", Some(num(1.0)))]),
        ]);
        let table = bound(&mut m);

        let x = top_level_symbol(&table, "x");
        assert_eq!(x.kind, SymbolKind::Var);
        assert_eq!(x.refs.len(), 1);
        assert!(!x.assigned);
    }

    #[test]
    fn test_let_is_block_scoped() {
        let mut m = module(vec![
            block_stmt(vec![var_decl(VarDeclKind::Let, "y", Some(num(1.0)))]),
            expr_stmt(id_expr("y")),
        ]);
        let table = bound(&mut m);

        // The top-level reference resolves to nothing.
        let Stmt::Expr(stmt) = &m.stmts[1] else {
            unreachable!()
        };
        assert_eq!(stmt.expr.as_ident().unwrap().symbol, None);
        assert!(!table.is_free_name_assigned("y"));
    }

    #[test]
    fn test_function_references_hoist() {
        let mut m = module(vec![
            expr_stmt(call("f", vec![])),
            fn_decl("f", &[], vec![]),
        ]);
        let table = bound(&mut m);

        let f = top_level_symbol(&table, "f");
        assert_eq!(f.kind, SymbolKind::Function);
        assert_eq!(f.refs.len(), 1);
    }

    #[test]
    fn test_params_shadow_module_bindings() {
        let mut m = module(vec![
            const_decl("a", num(1.0)),
            fn_decl("f", &["a"], vec![return_stmt(Some(id_expr("a")))]),
        ]);
        let table = bound(&mut m);

        let a = top_level_symbol(&table, "a");
        assert_eq!(a.refs.len(), 0);
    }

    #[test]
    fn test_assignment_tracking() {
        let mut m = module(vec![
            var_decl(VarDeclKind::Let, "counted", Some(num(0.0))),
            expr_stmt(assign(ident("counted"), num(1.0))),
            expr_stmt(assign(ident("free_name"), num(2.0))),
        ]);
        let table = bound(&mut m);

        assert!(top_level_symbol(&table, "counted").assigned);
        assert!(table.is_free_name_assigned("free_name"));
        assert!(!table.is_free_name_assigned("counted"));
    }

    #[test]
    fn test_initializer_is_not_an_assignment() {
        let mut m = module(vec![const_decl("a", num(1.0))]);
        let table = bound(&mut m);
        assert!(!top_level_symbol(&table, "a").assigned);
    }

    #[test]
    fn test_eval_detection() {
        let mut m = module(vec![expr_stmt(call("eval", vec![str_lit("1")]))]);
        let table = bound(&mut m);
        assert!(table.has_eval());

        let mut clean = module(vec![expr_stmt(call("evaluate", vec![]))]);
        let table = bound(&mut clean);
        assert!(!table.has_eval());
    }

    #[test]
    fn test_rebinding_is_idempotent() {
        let mut m = module(vec![
            const_decl("a", num(1.0)),
            expr_stmt(id_expr("a")),
        ]);
        let first = bound(&mut m);
        let second = bound(&mut m);
        assert_eq!(first.len(), second.len());
        assert_eq!(top_level_symbol(&second, "a").refs.len(), 1);
    }
}
