//! Read-only and in-place visitors over the statement model. Implementors
//! override the node hooks they care about and call the matching `walk_*`
//! function to keep descending.

use crate::ast::*;

pub trait Visit {
    fn visit_module(&mut self, m: &Module) {
        walk_module(self, m);
    }
    fn visit_stmt(&mut self, s: &Stmt) {
        walk_stmt(self, s);
    }
    fn visit_expr(&mut self, e: &Expr) {
        walk_expr(self, e);
    }
    fn visit_pat(&mut self, p: &Pat) {
        walk_pat(self, p);
    }
    fn visit_function(&mut self, f: &Function) {
        walk_function(self, f);
    }
    fn visit_class(&mut self, c: &Class) {
        walk_class(self, c);
    }
    fn visit_ident(&mut self, _i: &Ident) {}
}

pub fn walk_module<V: Visit + ?Sized>(v: &mut V, m: &Module) {
    for stmt in &m.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, s: &Stmt) {
    match s {
        Stmt::Import(import) => {
            for spec in &import.specifiers {
                v.visit_ident(spec.local());
            }
        }
        Stmt::ExportDecl(export) => walk_decl(v, &export.decl),
        Stmt::ExportNamed(export) => {
            if export.source.is_none() {
                for spec in &export.specifiers {
                    v.visit_ident(&spec.orig);
                }
            }
        }
        Stmt::ExportDefault(export) => match &export.decl {
            DefaultDecl::Fn(f) => {
                if let Some(ident) = &f.ident {
                    v.visit_ident(ident);
                }
                v.visit_function(&f.function);
            }
            DefaultDecl::Class(c) => {
                if let Some(ident) = &c.ident {
                    v.visit_ident(ident);
                }
                v.visit_class(&c.class);
            }
            DefaultDecl::Expr(e) => v.visit_expr(e),
        },
        Stmt::ExportStar(export) => {
            if let Some(alias) = &export.alias {
                v.visit_ident(alias);
            }
        }
        Stmt::Decl(decl) => walk_decl(v, decl),
        Stmt::Expr(stmt) => v.visit_expr(&stmt.expr),
        Stmt::Block(block) => {
            for stmt in &block.stmts {
                v.visit_stmt(stmt);
            }
        }
        Stmt::If(stmt) => {
            v.visit_expr(&stmt.test);
            v.visit_stmt(&stmt.cons);
            if let Some(alt) = &stmt.alt {
                v.visit_stmt(alt);
            }
        }
        Stmt::While(stmt) => {
            v.visit_expr(&stmt.test);
            v.visit_stmt(&stmt.body);
        }
        Stmt::For(stmt) => {
            match &stmt.init {
                Some(ForInit::Var(decl)) => walk_var_decl(v, decl),
                Some(ForInit::Expr(e)) => v.visit_expr(e),
                None => {}
            }
            if let Some(test) = &stmt.test {
                v.visit_expr(test);
            }
            if let Some(update) = &stmt.update {
                v.visit_expr(update);
            }
            v.visit_stmt(&stmt.body);
        }
        Stmt::Return(stmt) => {
            if let Some(arg) = &stmt.arg {
                v.visit_expr(arg);
            }
        }
        Stmt::Throw(stmt) => v.visit_expr(&stmt.arg),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
    }
}

pub fn walk_decl<V: Visit + ?Sized>(v: &mut V, d: &Decl) {
    match d {
        Decl::Var(decl) => walk_var_decl(v, decl),
        Decl::Fn(decl) => {
            v.visit_ident(&decl.ident);
            v.visit_function(&decl.function);
        }
        Decl::Class(decl) => {
            v.visit_ident(&decl.ident);
            v.visit_class(&decl.class);
        }
    }
}

fn walk_var_decl<V: Visit + ?Sized>(v: &mut V, d: &VarDecl) {
    for decl in &d.decls {
        v.visit_pat(&decl.name);
        if let Some(init) = &decl.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, e: &Expr) {
    match e {
        Expr::Ident(i) => v.visit_ident(i),
        Expr::Lit(_) | Expr::MetaProp(_) => {}
        Expr::Tpl(tpl) => {
            for expr in &tpl.exprs {
                v.visit_expr(expr);
            }
        }
        Expr::Unary(unary) => v.visit_expr(&unary.arg),
        Expr::Update(update) => v.visit_expr(&update.arg),
        Expr::Bin(bin) => {
            v.visit_expr(&bin.left);
            v.visit_expr(&bin.right);
        }
        Expr::Cond(cond) => {
            v.visit_expr(&cond.test);
            v.visit_expr(&cond.cons);
            v.visit_expr(&cond.alt);
        }
        Expr::Assign(assign) => {
            match &assign.target {
                AssignTarget::Ident(i) => v.visit_ident(i),
                AssignTarget::Member(m) => walk_member(v, m),
                AssignTarget::Pat(p) => v.visit_pat(p),
            }
            v.visit_expr(&assign.value);
        }
        Expr::Call(call) => {
            if let Callee::Expr(callee) = &call.callee {
                v.visit_expr(callee);
            }
            for arg in &call.args {
                v.visit_expr(&arg.expr);
            }
        }
        Expr::New(new) => {
            v.visit_expr(&new.callee);
            for arg in &new.args {
                v.visit_expr(&arg.expr);
            }
        }
        Expr::Member(member) => walk_member(v, member),
        Expr::Seq(seq) => {
            for expr in &seq.exprs {
                v.visit_expr(expr);
            }
        }
        Expr::Fn(f) => {
            if let Some(ident) = &f.ident {
                v.visit_ident(ident);
            }
            v.visit_function(&f.function);
        }
        Expr::Arrow(arrow) => {
            for param in &arrow.params {
                v.visit_pat(param);
            }
            match arrow.body.as_ref() {
                ArrowBody::Block(block) => {
                    for stmt in &block.stmts {
                        v.visit_stmt(stmt);
                    }
                }
                ArrowBody::Expr(expr) => v.visit_expr(expr),
            }
        }
        Expr::Object(object) => {
            for prop in &object.props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        walk_prop_name(v, key);
                        v.visit_expr(value);
                    }
                    Prop::Shorthand(ident) => v.visit_ident(ident),
                    Prop::Method { key, function } => {
                        walk_prop_name(v, key);
                        v.visit_function(function);
                    }
                    Prop::Spread(expr) => v.visit_expr(expr),
                }
            }
        }
        Expr::Array(array) => {
            for elem in array.elems.iter().flatten() {
                v.visit_expr(&elem.expr);
            }
        }
        Expr::Class(class) => {
            if let Some(ident) = &class.ident {
                v.visit_ident(ident);
            }
            v.visit_class(&class.class);
        }
    }
}

fn walk_member<V: Visit + ?Sized>(v: &mut V, m: &MemberExpr) {
    v.visit_expr(&m.obj);
    if let MemberProp::Computed(prop) = &m.prop {
        v.visit_expr(prop);
    }
}

fn walk_prop_name<V: Visit + ?Sized>(v: &mut V, p: &PropName) {
    if let PropName::Computed(expr) = p {
        v.visit_expr(expr);
    }
}

pub fn walk_pat<V: Visit + ?Sized>(v: &mut V, p: &Pat) {
    match p {
        Pat::Ident(i) => v.visit_ident(i),
        Pat::Assign(assign) => {
            v.visit_pat(&assign.pat);
            v.visit_expr(&assign.default);
        }
        Pat::Rest(rest) => v.visit_pat(rest),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                v.visit_pat(elem);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                if let PropName::Computed(key) = &prop.key {
                    v.visit_expr(key);
                }
                if let Some(value) = &prop.value {
                    v.visit_pat(value);
                }
            }
            if let Some(rest) = &object.rest {
                v.visit_pat(rest);
            }
        }
    }
}

pub fn walk_function<V: Visit + ?Sized>(v: &mut V, f: &Function) {
    for param in &f.params {
        v.visit_pat(param);
    }
    for stmt in &f.body.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_class<V: Visit + ?Sized>(v: &mut V, c: &Class) {
    if let Some(super_class) = &c.super_class {
        v.visit_expr(super_class);
    }
    for member in &c.members {
        walk_prop_name(v, &member.key);
        match &member.body {
            ClassMemberBody::Method(function) => v.visit_function(function),
            ClassMemberBody::Property(value) => {
                if let Some(value) = value {
                    v.visit_expr(value);
                }
            }
        }
    }
}

pub trait VisitMut {
    fn visit_mut_module(&mut self, m: &mut Module) {
        walk_mut_module(self, m);
    }
    fn visit_mut_stmt(&mut self, s: &mut Stmt) {
        walk_mut_stmt(self, s);
    }
    fn visit_mut_expr(&mut self, e: &mut Expr) {
        walk_mut_expr(self, e);
    }
    fn visit_mut_pat(&mut self, p: &mut Pat) {
        walk_mut_pat(self, p);
    }
    fn visit_mut_function(&mut self, f: &mut Function) {
        walk_mut_function(self, f);
    }
    fn visit_mut_class(&mut self, c: &mut Class) {
        walk_mut_class(self, c);
    }
    fn visit_mut_ident(&mut self, _i: &mut Ident) {}
}

pub fn walk_mut_module<V: VisitMut + ?Sized>(v: &mut V, m: &mut Module) {
    for stmt in &mut m.stmts {
        v.visit_mut_stmt(stmt);
    }
}

pub fn walk_mut_stmt<V: VisitMut + ?Sized>(v: &mut V, s: &mut Stmt) {
    match s {
        Stmt::Import(import) => {
            for spec in &mut import.specifiers {
                match spec {
                    ImportSpecifier::Named { local, .. }
                    | ImportSpecifier::Default { local }
                    | ImportSpecifier::Namespace { local } => v.visit_mut_ident(local),
                }
            }
        }
        Stmt::ExportDecl(export) => walk_mut_decl(v, &mut export.decl),
        Stmt::ExportNamed(export) => {
            if export.source.is_none() {
                for spec in &mut export.specifiers {
                    v.visit_mut_ident(&mut spec.orig);
                }
            }
        }
        Stmt::ExportDefault(export) => match &mut export.decl {
            DefaultDecl::Fn(f) => {
                if let Some(ident) = &mut f.ident {
                    v.visit_mut_ident(ident);
                }
                v.visit_mut_function(&mut f.function);
            }
            DefaultDecl::Class(c) => {
                if let Some(ident) = &mut c.ident {
                    v.visit_mut_ident(ident);
                }
                v.visit_mut_class(&mut c.class);
            }
            DefaultDecl::Expr(e) => v.visit_mut_expr(e),
        },
        Stmt::ExportStar(export) => {
            if let Some(alias) = &mut export.alias {
                v.visit_mut_ident(alias);
            }
        }
        Stmt::Decl(decl) => walk_mut_decl(v, decl),
        Stmt::Expr(stmt) => v.visit_mut_expr(&mut stmt.expr),
        Stmt::Block(block) => {
            for stmt in &mut block.stmts {
                v.visit_mut_stmt(stmt);
            }
        }
        Stmt::If(stmt) => {
            v.visit_mut_expr(&mut stmt.test);
            v.visit_mut_stmt(&mut stmt.cons);
            if let Some(alt) = &mut stmt.alt {
                v.visit_mut_stmt(alt);
            }
        }
        Stmt::While(stmt) => {
            v.visit_mut_expr(&mut stmt.test);
            v.visit_mut_stmt(&mut stmt.body);
        }
        Stmt::For(stmt) => {
            match &mut stmt.init {
                Some(ForInit::Var(decl)) => walk_mut_var_decl(v, decl),
                Some(ForInit::Expr(e)) => v.visit_mut_expr(e),
                None => {}
            }
            if let Some(test) = &mut stmt.test {
                v.visit_mut_expr(test);
            }
            if let Some(update) = &mut stmt.update {
                v.visit_mut_expr(update);
            }
            v.visit_mut_stmt(&mut stmt.body);
        }
        Stmt::Return(stmt) => {
            if let Some(arg) = &mut stmt.arg {
                v.visit_mut_expr(arg);
            }
        }
        Stmt::Throw(stmt) => v.visit_mut_expr(&mut stmt.arg),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
    }
}

pub fn walk_mut_decl<V: VisitMut + ?Sized>(v: &mut V, d: &mut Decl) {
    match d {
        Decl::Var(decl) => walk_mut_var_decl(v, decl),
        Decl::Fn(decl) => {
            v.visit_mut_ident(&mut decl.ident);
            v.visit_mut_function(&mut decl.function);
        }
        Decl::Class(decl) => {
            v.visit_mut_ident(&mut decl.ident);
            v.visit_mut_class(&mut decl.class);
        }
    }
}

fn walk_mut_var_decl<V: VisitMut + ?Sized>(v: &mut V, d: &mut VarDecl) {
    for decl in &mut d.decls {
        v.visit_mut_pat(&mut decl.name);
        if let Some(init) = &mut decl.init {
            v.visit_mut_expr(init);
        }
    }
}

pub fn walk_mut_expr<V: VisitMut + ?Sized>(v: &mut V, e: &mut Expr) {
    match e {
        Expr::Ident(i) => v.visit_mut_ident(i),
        Expr::Lit(_) | Expr::MetaProp(_) => {}
        Expr::Tpl(tpl) => {
            for expr in &mut tpl.exprs {
                v.visit_mut_expr(expr);
            }
        }
        Expr::Unary(unary) => v.visit_mut_expr(&mut unary.arg),
        Expr::Update(update) => v.visit_mut_expr(&mut update.arg),
        Expr::Bin(bin) => {
            v.visit_mut_expr(&mut bin.left);
            v.visit_mut_expr(&mut bin.right);
        }
        Expr::Cond(cond) => {
            v.visit_mut_expr(&mut cond.test);
            v.visit_mut_expr(&mut cond.cons);
            v.visit_mut_expr(&mut cond.alt);
        }
        Expr::Assign(assign) => {
            match &mut assign.target {
                AssignTarget::Ident(i) => v.visit_mut_ident(i),
                AssignTarget::Member(m) => walk_mut_member(v, m),
                AssignTarget::Pat(p) => v.visit_mut_pat(p),
            }
            v.visit_mut_expr(&mut assign.value);
        }
        Expr::Call(call) => {
            if let Callee::Expr(callee) = &mut call.callee {
                v.visit_mut_expr(callee);
            }
            for arg in &mut call.args {
                v.visit_mut_expr(&mut arg.expr);
            }
        }
        Expr::New(new) => {
            v.visit_mut_expr(&mut new.callee);
            for arg in &mut new.args {
                v.visit_mut_expr(&mut arg.expr);
            }
        }
        Expr::Member(member) => walk_mut_member(v, member),
        Expr::Seq(seq) => {
            for expr in &mut seq.exprs {
                v.visit_mut_expr(expr);
            }
        }
        Expr::Fn(f) => {
            if let Some(ident) = &mut f.ident {
                v.visit_mut_ident(ident);
            }
            v.visit_mut_function(&mut f.function);
        }
        Expr::Arrow(arrow) => {
            for param in &mut arrow.params {
                v.visit_mut_pat(param);
            }
            match arrow.body.as_mut() {
                ArrowBody::Block(block) => {
                    for stmt in &mut block.stmts {
                        v.visit_mut_stmt(stmt);
                    }
                }
                ArrowBody::Expr(expr) => v.visit_mut_expr(expr),
            }
        }
        Expr::Object(object) => {
            for prop in &mut object.props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        walk_mut_prop_name(v, key);
                        v.visit_mut_expr(value);
                    }
                    Prop::Shorthand(ident) => v.visit_mut_ident(ident),
                    Prop::Method { key, function } => {
                        walk_mut_prop_name(v, key);
                        v.visit_mut_function(function);
                    }
                    Prop::Spread(expr) => v.visit_mut_expr(expr),
                }
            }
        }
        Expr::Array(array) => {
            for elem in array.elems.iter_mut().flatten() {
                v.visit_mut_expr(&mut elem.expr);
            }
        }
        Expr::Class(class) => {
            if let Some(ident) = &mut class.ident {
                v.visit_mut_ident(ident);
            }
            v.visit_mut_class(&mut class.class);
        }
    }
}

fn walk_mut_member<V: VisitMut + ?Sized>(v: &mut V, m: &mut MemberExpr) {
    v.visit_mut_expr(&mut m.obj);
    if let MemberProp::Computed(prop) = &mut m.prop {
        v.visit_mut_expr(prop);
    }
}

fn walk_mut_prop_name<V: VisitMut + ?Sized>(v: &mut V, p: &mut PropName) {
    if let PropName::Computed(expr) = p {
        v.visit_mut_expr(expr);
    }
}

pub fn walk_mut_pat<V: VisitMut + ?Sized>(v: &mut V, p: &mut Pat) {
    match p {
        Pat::Ident(i) => v.visit_mut_ident(i),
        Pat::Assign(assign) => {
            v.visit_mut_pat(&mut assign.pat);
            v.visit_mut_expr(&mut assign.default);
        }
        Pat::Rest(rest) => v.visit_mut_pat(rest),
        Pat::Array(array) => {
            for elem in array.elems.iter_mut().flatten() {
                v.visit_mut_pat(elem);
            }
        }
        Pat::Object(object) => {
            for prop in &mut object.props {
                if let PropName::Computed(key) = &mut prop.key {
                    v.visit_mut_expr(key);
                }
                if let Some(value) = &mut prop.value {
                    v.visit_mut_pat(value);
                }
            }
            if let Some(rest) = &mut object.rest {
                v.visit_mut_pat(rest);
            }
        }
    }
}

pub fn walk_mut_function<V: VisitMut + ?Sized>(v: &mut V, f: &mut Function) {
    for param in &mut f.params {
        v.visit_mut_pat(param);
    }
    for stmt in &mut f.body.stmts {
        v.visit_mut_stmt(stmt);
    }
}

pub fn walk_mut_class<V: VisitMut + ?Sized>(v: &mut V, c: &mut Class) {
    if let Some(super_class) = &mut c.super_class {
        v.visit_mut_expr(super_class);
    }
    for member in &mut c.members {
        walk_mut_prop_name(v, &mut member.key);
        match &mut member.body {
            ClassMemberBody::Method(function) => v.visit_mut_function(function),
            ClassMemberBody::Property(value) => {
                if let Some(value) = value {
                    v.visit_mut_expr(value);
                }
            }
        }
    }
}
