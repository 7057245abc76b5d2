//! Literal evaluation with exact JavaScript semantics. Every function here
//! either produces the value the runtime would or returns `None`, and callers
//! treat `None` as "leave the expression alone".

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Pow, ToPrimitive, Zero};

use crate::ast::bind::SymbolTable;
use crate::ast::{BinExpr, BinaryOp, Expr, JsNumber, Lit, MemberProp, Tpl, UnaryOp};
use crate::tree_shaking::statement_graph::expr_has_effects;

/// Largest `BigInt` exponent evaluated at compile time. Larger powers blow
/// up the emitted literal and are left to the runtime.
const MAX_BIGINT_EXP: u32 = 4096;

/// One evaluation attempt at a node whose children are already folded.
/// Returns the replacement expression when the result is known exactly.
pub(crate) fn eval_expr(expr: &Expr, symbols: &SymbolTable) -> Option<Expr> {
    match expr {
        Expr::Unary(unary) => eval_unary(unary.op, unary.arg.as_lit()?).map(Expr::Lit),
        Expr::Bin(bin) => eval_bin_expr(bin, symbols),
        Expr::Cond(cond) => {
            let test = cond.test.as_lit()?;
            Some(if lit_truthiness(test) {
                (*cond.cons).clone()
            } else {
                (*cond.alt).clone()
            })
        }
        Expr::Tpl(tpl) => eval_template(tpl).map(|s| Expr::Lit(Lit::Str(s))),
        Expr::Member(member) => {
            let value = member.obj.as_str_lit()?;
            match &member.prop {
                MemberProp::Ident(name) if name == "length" => {
                    Some(Expr::Lit(Lit::Num(JsNumber(utf16_len(value) as f64))))
                }
                _ => None,
            }
        }
        Expr::Seq(seq) if seq.exprs.len() >= 2 => {
            let (last, rest) = seq.exprs.split_last()?;
            if rest.iter().any(|e| expr_has_effects(e)) {
                return None;
            }
            Some(last.clone())
        }
        _ => None,
    }
}

fn eval_bin_expr(bin: &BinExpr, symbols: &SymbolTable) -> Option<Expr> {
    if let Some(value) = eval_typeof_guard(bin, symbols) {
        return Some(Expr::Lit(Lit::Bool(value)));
    }
    match bin.op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalescing => {
            let left = bin.left.as_lit()?;
            let take_left = match bin.op {
                BinaryOp::And => !lit_truthiness(left),
                BinaryOp::Or => lit_truthiness(left),
                _ => !matches!(left, Lit::Null | Lit::Undefined),
            };
            // The selected operand evaluates exactly when the runtime would
            // have evaluated it, so the right side may be any expression.
            Some(if take_left {
                (*bin.left).clone()
            } else {
                (*bin.right).clone()
            })
        }
        _ => eval_binary(bin.op, bin.left.as_lit()?, bin.right.as_lit()?).map(Expr::Lit),
    }
}

/// The undefined-existence guard: `typeof x === "undefined"` or one of its
/// `!==`/`==`/`!=` variants over a name bound nowhere in the module. A
/// comparison against any other string never folds.
fn eval_typeof_guard(bin: &BinExpr, symbols: &SymbolTable) -> Option<bool> {
    if !bin.op.is_equality() {
        return None;
    }
    let compared = if is_free_typeof(&bin.left, symbols) {
        bin.right.as_str_lit()?
    } else if is_free_typeof(&bin.right, symbols) {
        bin.left.as_str_lit()?
    } else {
        return None;
    };
    if compared != "undefined" {
        return None;
    }
    Some(matches!(bin.op, BinaryOp::EqEq | BinaryOp::EqEqEq))
}

/// `typeof <free name>`, in a module where neither an assignment nor an
/// `eval` can bring the name into existence.
fn is_free_typeof(expr: &Expr, symbols: &SymbolTable) -> bool {
    let Expr::Unary(unary) = expr else {
        return false;
    };
    if unary.op != UnaryOp::TypeOf {
        return false;
    }
    let Some(ident) = unary.arg.as_ident() else {
        return false;
    };
    ident.symbol.is_none() && !symbols.has_eval() && !symbols.is_free_name_assigned(&ident.sym)
}

fn eval_template(tpl: &Tpl) -> Option<String> {
    let mut out = String::new();
    for (i, quasi) in tpl.quasis.iter().enumerate() {
        out.push_str(quasi);
        if let Some(expr) = tpl.exprs.get(i) {
            out.push_str(&lit_to_js_string(expr.as_lit()?));
        }
    }
    Some(out)
}

fn eval_unary(op: UnaryOp, arg: &Lit) -> Option<Lit> {
    match op {
        UnaryOp::Minus => match arg {
            Lit::BigInt(b) => Some(Lit::BigInt(-b.clone())),
            _ => Some(Lit::Num(JsNumber(-lit_to_js_number(arg)?))),
        },
        // `+1n` is a TypeError; strings need the full ToNumber grammar.
        UnaryOp::Plus => Some(Lit::Num(JsNumber(lit_to_js_number(arg)?))),
        UnaryOp::Bang => Some(Lit::Bool(!lit_truthiness(arg))),
        UnaryOp::Tilde => match arg {
            Lit::BigInt(b) => Some(Lit::BigInt(-(b.clone() + BigInt::from(1)))),
            _ => Some(Lit::Num(JsNumber(
                !to_int32(lit_to_js_number(arg)?) as f64,
            ))),
        },
        UnaryOp::Void => Some(Lit::Undefined),
        // `typeof` folds only through the guard pattern above, and `delete`
        // is never a literal operation.
        UnaryOp::TypeOf | UnaryOp::Delete => None,
    }
}

fn eval_binary(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    // Mixing BigInt and Number either throws or tracks coercion subtleties
    // this pass does not model; declined wholesale.
    if bigint_number_mix(left, right) {
        return None;
    }
    match op {
        BinaryOp::Add => eval_add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Exp => {
            eval_arithmetic(op, left, right)
        }
        BinaryOp::EqEqEq | BinaryOp::NotEqEq => eval_strict_eq(op, left, right),
        BinaryOp::EqEq | BinaryOp::NotEq => eval_loose_eq(op, left, right),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            eval_relational(op, left, right)
        }
        BinaryOp::LShift
        | BinaryOp::RShift
        | BinaryOp::ZeroFillRShift
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor => eval_bitwise(op, left, right),
        BinaryOp::In | BinaryOp::InstanceOf => None,
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalescing => None,
    }
}

fn bigint_number_mix(left: &Lit, right: &Lit) -> bool {
    matches!(
        (left, right),
        (Lit::BigInt(_), Lit::Num(_)) | (Lit::Num(_), Lit::BigInt(_))
    )
}

fn eval_add(left: &Lit, right: &Lit) -> Option<Lit> {
    match (left, right) {
        (Lit::BigInt(l), Lit::BigInt(r)) => Some(Lit::BigInt(l + r)),
        (Lit::Str(_), _) | (_, Lit::Str(_)) => Some(Lit::Str(format!(
            "{}{}",
            lit_to_js_string(left),
            lit_to_js_string(right)
        ))),
        _ => {
            let sum = lit_to_js_number(left)? + lit_to_js_number(right)?;
            Some(Lit::Num(JsNumber(sum)))
        }
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    if let (Lit::BigInt(l), Lit::BigInt(r)) = (left, right) {
        return match op {
            BinaryOp::Sub => Some(Lit::BigInt(l - r)),
            BinaryOp::Mul => Some(Lit::BigInt(l * r)),
            // Truncated toward zero, matching the runtime. A zero divisor
            // throws there, so it stays in the source.
            BinaryOp::Div if !r.is_zero() => Some(Lit::BigInt(l / r)),
            BinaryOp::Mod if !r.is_zero() => Some(Lit::BigInt(l % r)),
            BinaryOp::Exp => {
                let exp = r.to_u32().filter(|e| *e <= MAX_BIGINT_EXP)?;
                Some(Lit::BigInt(Pow::pow(l, exp)))
            }
            _ => None,
        };
    }
    let l = lit_to_js_number(left)?;
    let r = lit_to_js_number(right)?;
    let value = match op {
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        BinaryOp::Mod => l % r,
        BinaryOp::Exp => js_exp(l, r),
        _ => unreachable!(),
    };
    Some(Lit::Num(JsNumber(value)))
}

/// `**` deviates from IEEE `pow`: a NaN exponent, or a base of magnitude
/// one with an infinite exponent, gives NaN.
fn js_exp(base: f64, exp: f64) -> f64 {
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exp)
    }
}

fn eval_strict_eq(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    let equal = match (left, right) {
        // Raw IEEE comparison: NaN is unequal to itself.
        (Lit::Num(l), Lit::Num(r)) => l.0 == r.0,
        (Lit::Str(l), Lit::Str(r)) => l == r,
        (Lit::Bool(l), Lit::Bool(r)) => l == r,
        (Lit::BigInt(l), Lit::BigInt(r)) => l == r,
        (Lit::Null, Lit::Null) | (Lit::Undefined, Lit::Undefined) => true,
        _ => false,
    };
    Some(Lit::Bool(if op == BinaryOp::EqEqEq { equal } else { !equal }))
}

fn eval_loose_eq(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    let equal = match (left, right) {
        (Lit::Null | Lit::Undefined, Lit::Null | Lit::Undefined) => true,
        (Lit::Num(l), Lit::Num(r)) => l.0 == r.0,
        (Lit::Str(l), Lit::Str(r)) => l == r,
        (Lit::Bool(l), Lit::Bool(r)) => l == r,
        (Lit::BigInt(l), Lit::BigInt(r)) => l == r,
        // Remaining cross-type pairs coerce; left to the runtime.
        _ => return None,
    };
    Some(Lit::Bool(if op == BinaryOp::EqEq { equal } else { !equal }))
}

fn eval_relational(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    let ordering = match (left, right) {
        // Strings compare by UTF-16 code unit, which disagrees with `str`
        // ordering beyond the basic plane.
        (Lit::Str(l), Lit::Str(r)) => Some(l.encode_utf16().cmp(r.encode_utf16())),
        (Lit::BigInt(l), Lit::BigInt(r)) => Some(l.cmp(r)),
        _ => lit_to_js_number(left)?.partial_cmp(&lit_to_js_number(right)?),
    };
    let result = match ordering {
        // A NaN operand makes every relational comparison false.
        None => false,
        Some(ordering) => match op {
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::GtEq => ordering != Ordering::Less,
            _ => unreachable!(),
        },
    };
    Some(Lit::Bool(result))
}

fn eval_bitwise(op: BinaryOp, left: &Lit, right: &Lit) -> Option<Lit> {
    let l = lit_to_js_number(left)?;
    let r = lit_to_js_number(right)?;
    let value = match op {
        BinaryOp::LShift => (to_int32(l) << (to_uint32(r) & 31)) as f64,
        BinaryOp::RShift => (to_int32(l) >> (to_uint32(r) & 31)) as f64,
        BinaryOp::ZeroFillRShift => (to_uint32(l) >> (to_uint32(r) & 31)) as f64,
        BinaryOp::BitAnd => (to_int32(l) & to_int32(r)) as f64,
        BinaryOp::BitOr => (to_int32(l) | to_int32(r)) as f64,
        BinaryOp::BitXor => (to_int32(l) ^ to_int32(r)) as f64,
        _ => unreachable!(),
    };
    Some(Lit::Num(JsNumber(value)))
}

pub(crate) fn lit_truthiness(lit: &Lit) -> bool {
    match lit {
        Lit::Str(s) => !s.is_empty(),
        Lit::Num(n) => n.is_truthy(),
        Lit::BigInt(b) => !b.is_zero(),
        Lit::Bool(b) => *b,
        Lit::Null | Lit::Undefined => false,
    }
}

/// `ToString` of a literal. Numbers go through the shortest-round-trip
/// formatter, BigInts print their digits without the `n` suffix.
fn lit_to_js_string(lit: &Lit) -> String {
    match lit {
        Lit::Str(s) => s.clone(),
        Lit::Num(n) => n.to_js_string(),
        Lit::BigInt(b) => b.to_str_radix(10),
        Lit::Bool(true) => "true".to_string(),
        Lit::Bool(false) => "false".to_string(),
        Lit::Null => "null".to_string(),
        Lit::Undefined => "undefined".to_string(),
    }
}

/// `ToNumber` for the literal kinds that need no string parsing. Strings
/// would need the full numeric grammar and BigInts throw, so both decline.
fn lit_to_js_number(lit: &Lit) -> Option<f64> {
    match lit {
        Lit::Num(n) => Some(n.0),
        Lit::Bool(true) => Some(1.0),
        Lit::Bool(false) => Some(0.0),
        Lit::Null => Some(0.0),
        Lit::Undefined => Some(f64::NAN),
        Lit::Str(_) | Lit::BigInt(_) => None,
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// ToUint32: the truncated value modulo 2^32. `%` on doubles is exact, so
/// every finite input maps precisely.
fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4294967296.0;
    let m = if m < 0.0 { m + 4294967296.0 } else { m };
    m as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::bind::bind_module;
    use crate::test_helper::ast::*;

    fn n(value: f64) -> Lit {
        Lit::Num(JsNumber(value))
    }

    fn s(value: &str) -> Lit {
        Lit::Str(value.to_string())
    }

    fn big(value: i64) -> Lit {
        Lit::BigInt(BigInt::from(value))
    }

    #[test]
    fn test_number_arithmetic_is_exact() {
        assert_eq!(eval_binary(BinaryOp::Add, &n(1.0), &n(2.0)), Some(n(3.0)));
        assert_eq!(
            eval_binary(BinaryOp::Add, &n(0.1), &n(0.2)),
            Some(n(0.30000000000000004))
        );
        assert_eq!(
            eval_binary(BinaryOp::Div, &n(1.0), &n(0.0)),
            Some(n(f64::INFINITY))
        );
        assert_eq!(eval_binary(BinaryOp::Div, &n(0.0), &n(0.0)), Some(n(f64::NAN)));
        assert_eq!(eval_binary(BinaryOp::Mod, &n(7.0), &n(-2.0)), Some(n(1.0)));
        assert_eq!(eval_binary(BinaryOp::Mod, &n(-7.0), &n(2.0)), Some(n(-1.0)));
        assert_eq!(eval_binary(BinaryOp::Add, &n(1.0), &Lit::Null), Some(n(1.0)));
        assert_eq!(
            eval_binary(BinaryOp::Sub, &Lit::Bool(true), &n(0.5)),
            Some(n(0.5))
        );
    }

    #[test]
    fn test_exponent_handles_the_ieee_deviations() {
        assert_eq!(
            eval_binary(BinaryOp::Exp, &n(2.0), &n(10.0)),
            Some(n(1024.0))
        );
        assert_eq!(
            eval_binary(BinaryOp::Exp, &n(2.0), &n(f64::NAN)),
            Some(n(f64::NAN))
        );
        assert_eq!(
            eval_binary(BinaryOp::Exp, &n(1.0), &n(f64::INFINITY)),
            Some(n(f64::NAN))
        );
        assert_eq!(
            eval_binary(BinaryOp::Exp, &n(-1.0), &n(f64::NEG_INFINITY)),
            Some(n(f64::NAN))
        );
    }

    #[test]
    fn test_string_concat_formats_numbers_like_the_runtime() {
        assert_eq!(
            eval_binary(BinaryOp::Add, &s("v"), &n(1e21)),
            Some(s("v1e+21"))
        );
        assert_eq!(
            eval_binary(BinaryOp::Add, &n(999999999999999934464.0), &s("")),
            Some(s("1e+21"))
        );
        assert_eq!(
            eval_binary(BinaryOp::Add, &s("a"), &Lit::Null),
            Some(s("anull"))
        );
        assert_eq!(eval_binary(BinaryOp::Add, &big(1), &s("x")), Some(s("1x")));
    }

    #[test]
    fn test_strict_equality_on_literals() {
        assert_eq!(
            eval_binary(BinaryOp::EqEqEq, &n(f64::NAN), &n(f64::NAN)),
            Some(Lit::Bool(false))
        );
        assert_eq!(
            eval_binary(BinaryOp::EqEqEq, &s("1"), &n(1.0)),
            Some(Lit::Bool(false))
        );
        assert_eq!(
            eval_binary(BinaryOp::EqEqEq, &Lit::Null, &Lit::Undefined),
            Some(Lit::Bool(false))
        );
        assert_eq!(
            eval_binary(BinaryOp::EqEqEq, &big(1), &big(1)),
            Some(Lit::Bool(true))
        );
        // BigInt against Number never folds, not even to `false`.
        assert_eq!(eval_binary(BinaryOp::EqEqEq, &big(1), &n(1.0)), None);
        assert_eq!(eval_binary(BinaryOp::NotEqEq, &n(1.0), &big(1)), None);
    }

    #[test]
    fn test_loose_equality_folds_only_without_coercion() {
        assert_eq!(
            eval_binary(BinaryOp::EqEq, &Lit::Null, &Lit::Undefined),
            Some(Lit::Bool(true))
        );
        assert_eq!(
            eval_binary(BinaryOp::NotEq, &Lit::Undefined, &Lit::Null),
            Some(Lit::Bool(false))
        );
        assert_eq!(eval_binary(BinaryOp::EqEq, &s("1"), &n(1.0)), None);
        assert_eq!(eval_binary(BinaryOp::EqEq, &Lit::Bool(true), &n(1.0)), None);
        assert_eq!(eval_binary(BinaryOp::EqEq, &Lit::Null, &n(0.0)), None);
    }

    #[test]
    fn test_relational_strings_compare_by_utf16_unit() {
        // U+10000 encodes as a surrogate pair starting at 0xD800, below
        // U+E000, so the JS answer disagrees with byte order.
        assert_eq!(
            eval_binary(BinaryOp::Lt, &s("\u{10000}"), &s("\u{E000}")),
            Some(Lit::Bool(true))
        );
        assert_eq!(
            eval_binary(BinaryOp::Lt, &s("a"), &s("b")),
            Some(Lit::Bool(true))
        );
        assert_eq!(
            eval_binary(BinaryOp::Lt, &n(f64::NAN), &n(1.0)),
            Some(Lit::Bool(false))
        );
        assert_eq!(
            eval_binary(BinaryOp::GtEq, &n(f64::NAN), &n(1.0)),
            Some(Lit::Bool(false))
        );
        assert_eq!(
            eval_binary(BinaryOp::LtEq, &big(-3), &big(-2)),
            Some(Lit::Bool(true))
        );
    }

    #[test]
    fn test_bigint_arithmetic_is_arbitrary_precision() {
        let huge = "18446744073709551616".parse::<BigInt>().unwrap();
        assert_eq!(
            eval_binary(BinaryOp::Exp, &big(2), &big(64)),
            Some(Lit::BigInt(huge))
        );
        assert_eq!(eval_binary(BinaryOp::Div, &big(7), &big(2)), Some(big(3)));
        assert_eq!(eval_binary(BinaryOp::Div, &big(-7), &big(2)), Some(big(-3)));
        assert_eq!(eval_binary(BinaryOp::Mod, &big(7), &big(2)), Some(big(1)));
        assert_eq!(eval_binary(BinaryOp::Mod, &big(-7), &big(2)), Some(big(-1)));
        assert_eq!(eval_binary(BinaryOp::Div, &big(1), &big(0)), None);
        assert_eq!(eval_binary(BinaryOp::Exp, &big(2), &big(-1)), None);
        assert_eq!(eval_binary(BinaryOp::Exp, &big(2), &big(5000)), None);
        assert_eq!(eval_binary(BinaryOp::BitAnd, &big(6), &big(3)), None);
    }

    #[test]
    fn test_bitwise_wraps_to_int32() {
        assert_eq!(
            eval_binary(BinaryOp::BitOr, &n(4294967301.0), &n(0.0)),
            Some(n(5.0))
        );
        assert_eq!(
            eval_binary(BinaryOp::BitOr, &n(2147483648.0), &n(0.0)),
            Some(n(-2147483648.0))
        );
        assert_eq!(
            eval_binary(BinaryOp::ZeroFillRShift, &n(-1.0), &n(0.0)),
            Some(n(4294967295.0))
        );
        // Shift counts are taken modulo 32.
        assert_eq!(
            eval_binary(BinaryOp::LShift, &n(1.0), &n(35.0)),
            Some(n(8.0))
        );
        assert_eq!(
            eval_binary(BinaryOp::RShift, &n(-8.0), &n(1.0)),
            Some(n(-4.0))
        );
        assert_eq!(
            eval_binary(BinaryOp::BitXor, &n(5.0), &n(3.0)),
            Some(n(6.0))
        );
    }

    #[test]
    fn test_unary_on_literals() {
        assert_eq!(eval_unary(UnaryOp::Minus, &n(1.5)), Some(n(-1.5)));
        assert_eq!(eval_unary(UnaryOp::Minus, &big(1)), Some(big(-1)));
        assert_eq!(eval_unary(UnaryOp::Plus, &Lit::Bool(true)), Some(n(1.0)));
        assert_eq!(
            eval_unary(UnaryOp::Plus, &Lit::Undefined),
            Some(n(f64::NAN))
        );
        assert_eq!(eval_unary(UnaryOp::Plus, &big(1)), None);
        assert_eq!(eval_unary(UnaryOp::Plus, &s("5")), None);
        assert_eq!(eval_unary(UnaryOp::Bang, &s("")), Some(Lit::Bool(true)));
        assert_eq!(eval_unary(UnaryOp::Bang, &s("0")), Some(Lit::Bool(false)));
        assert_eq!(eval_unary(UnaryOp::Tilde, &n(5.0)), Some(n(-6.0)));
        assert_eq!(eval_unary(UnaryOp::Tilde, &big(5)), Some(big(-6)));
        assert_eq!(eval_unary(UnaryOp::Void, &n(0.0)), Some(Lit::Undefined));
        assert_eq!(eval_unary(UnaryOp::TypeOf, &n(0.0)), None);
    }

    #[test]
    fn test_typeof_guard_folds_only_the_undefined_comparison() {
        let table = SymbolTable::default();
        let guard = bin(
            BinaryOp::EqEqEq,
            typeof_of(id_expr("process")),
            str_lit("undefined"),
        );
        assert_eq!(eval_expr(&guard, &table), Some(bool_lit(true)));

        let negated = bin(
            BinaryOp::NotEqEq,
            str_lit("undefined"),
            typeof_of(id_expr("process")),
        );
        assert_eq!(eval_expr(&negated, &table), Some(bool_lit(false)));

        let other = bin(
            BinaryOp::NotEqEq,
            typeof_of(id_expr("process")),
            str_lit("object"),
        );
        assert_eq!(eval_expr(&other, &table), None);
    }

    #[test]
    fn test_typeof_guard_respects_eval_and_free_writes() {
        let guard = bin(
            BinaryOp::EqEqEq,
            typeof_of(id_expr("nav")),
            str_lit("undefined"),
        );

        let mut with_eval = module(vec![expr_stmt(call("eval", vec![str_lit("nav = 1")]))]);
        let table = bind_module(&mut with_eval);
        assert_eq!(eval_expr(&guard, &table), None);

        let mut with_write = module(vec![expr_stmt(assign(ident("nav"), num(5.0)))]);
        let table = bind_module(&mut with_write);
        assert_eq!(eval_expr(&guard, &table), None);
    }

    #[test]
    fn test_conditional_and_logical_selection() {
        let table = SymbolTable::default();
        assert_eq!(
            eval_expr(&cond(bool_lit(true), num(1.0), num(2.0)), &table),
            Some(num(1.0))
        );
        assert_eq!(
            eval_expr(
                &bin(BinaryOp::And, bool_lit(true), call("f", vec![])),
                &table
            ),
            Some(call("f", vec![]))
        );
        assert_eq!(
            eval_expr(
                &bin(BinaryOp::And, num(0.0), call("f", vec![])),
                &table
            ),
            Some(num(0.0))
        );
        assert_eq!(
            eval_expr(&bin(BinaryOp::Or, bool_lit(false), id_expr("x")), &table),
            Some(id_expr("x"))
        );
        assert_eq!(
            eval_expr(
                &bin(BinaryOp::NullishCoalescing, null_lit(), num(7.0)),
                &table
            ),
            Some(num(7.0))
        );
        assert_eq!(
            eval_expr(
                &bin(BinaryOp::NullishCoalescing, num(0.0), num(7.0)),
                &table
            ),
            Some(num(0.0))
        );
    }

    #[test]
    fn test_template_collapse_and_string_length() {
        let table = SymbolTable::default();
        assert_eq!(
            eval_expr(&tpl(&["v", "!"], vec![num(1e21)]), &table),
            Some(str_lit("v1e+21"))
        );
        assert_eq!(eval_expr(&tpl(&["plain"], vec![]), &table), Some(str_lit("plain")));
        assert_eq!(
            eval_expr(&tpl(&["", ""], vec![call("f", vec![])]), &table),
            None
        );
        assert_eq!(
            eval_expr(&member(str_lit("\u{1D11E}"), "length"), &table),
            Some(num(2.0))
        );
        assert_eq!(eval_expr(&member(str_lit("ok"), "charAt"), &table), None);
    }

    #[test]
    fn test_pure_sequence_folds_to_its_last_value() {
        let table = SymbolTable::default();
        assert_eq!(
            eval_expr(&seq(vec![num(1.0), num(2.0)]), &table),
            Some(num(2.0))
        );
        assert_eq!(
            eval_expr(&seq(vec![call("f", vec![]), num(2.0)]), &table),
            None
        );
    }
}
