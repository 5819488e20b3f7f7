//! Token literals: reading them from attribute expressions and writing them
//! back into generated code.

use std::fmt::Display;
use std::str::FromStr;

use fsmgen_core::{TokenKind, TokenValue};
use proc_macro2::{Literal, Span, TokenStream};
use quote::{ToTokens, quote};
use syn::{Error, Expr, ExprLit, Lit, LitFloat, LitInt, LitStr, Type, UnOp};

/// Maps a `token = ..` type onto its kind and the type emitted in generated
/// signatures. `&str` becomes `&'static str`.
pub fn classify_token_type(ty: &Type) -> syn::Result<(TokenKind, Type)> {
    if let Type::Reference(reference) = ty
        && reference.mutability.is_none()
        && reference.elem.to_token_stream().to_string() == "str"
    {
        return Ok((TokenKind::Str, syn::parse_quote!(&'static str)));
    }

    let spelled = ty.to_token_stream().to_string().replace(' ', "");
    let kind = match spelled.as_str() {
        "String" | "std::string::String" | "::std::string::String" => TokenKind::Str,
        other => TokenKind::ALL
            .into_iter()
            .find(|kind| kind.name() == other && *kind != TokenKind::Str)
            .ok_or_else(|| {
                Error::new_spanned(
                    ty,
                    "unsupported token type: expected bool, char, a fixed-width integer, f32, f64, String or &str",
                )
            })?,
    };
    Ok((kind, ty.clone()))
}

/// A token value that can be written as a Rust literal.
pub trait LiteralToken: TokenValue + Sized {
    fn parse_literal(expr: &Expr) -> syn::Result<Self>;

    fn literal(&self) -> TokenStream;

    /// Exact comparison of the generated function's `token` argument with
    /// this value.
    fn exact_test(&self) -> TokenStream {
        let literal = self.literal();
        quote!(::fsmgen::TokenValue::same(token, &#literal))
    }

    fn range_test(start: &Self, end: &Self) -> TokenStream {
        let (start, end) = (start.literal(), end.literal());
        quote!(::fsmgen::token::within(token, &#start, &#end))
    }
}

/// Splits a leading unary minus off `expr`, looking through groups and
/// parentheses.
fn negation(expr: &Expr) -> (bool, &Expr) {
    match strip(expr) {
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => (true, strip(&unary.expr)),
        other => (false, other),
    }
}

fn strip(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => strip(&paren.expr),
        Expr::Group(group) => strip(&group.expr),
        other => other,
    }
}

fn expected(expr: &Expr, kind: &str) -> Error {
    Error::new_spanned(expr, format!("expected a `{kind}` literal"))
}

fn check_suffix(expr: &Expr, suffix: &str, kind: &str) -> syn::Result<()> {
    if suffix.is_empty() || suffix == kind {
        Ok(())
    } else {
        Err(Error::new_spanned(
            expr,
            format!("literal suffix `{suffix}` does not match token type `{kind}`"),
        ))
    }
}

fn integer<T>(expr: &Expr, kind: &str) -> syn::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let (negative, inner) = negation(expr);
    let digits = match inner {
        Expr::Lit(ExprLit { lit: Lit::Int(lit), .. }) => {
            check_suffix(expr, lit.suffix(), kind)?;
            lit.base10_digits().to_owned()
        }
        Expr::Lit(ExprLit { lit: Lit::Byte(lit), .. }) if kind == "u8" && !negative => lit.value().to_string(),
        _ => return Err(expected(expr, kind)),
    };
    let digits = if negative { format!("-{digits}") } else { digits };
    digits
        .parse()
        .map_err(|err| Error::new_spanned(expr, format!("invalid `{kind}` literal: {err}")))
}

fn float(expr: &Expr, kind: &str) -> syn::Result<f64> {
    let (negative, inner) = negation(expr);
    let digits = match inner {
        Expr::Lit(ExprLit { lit: Lit::Float(lit), .. }) => {
            check_suffix(expr, lit.suffix(), kind)?;
            lit.base10_digits().to_owned()
        }
        Expr::Lit(ExprLit { lit: Lit::Int(lit), .. }) => {
            check_suffix(expr, lit.suffix(), kind)?;
            lit.base10_digits().to_owned()
        }
        _ => return Err(expected(expr, kind)),
    };
    let value: f64 = digits
        .parse()
        .map_err(|err| Error::new_spanned(expr, format!("invalid `{kind}` literal: {err}")))?;
    if !value.is_finite() {
        return Err(Error::new_spanned(expr, format!("`{kind}` literal is out of range")));
    }
    Ok(if negative { -value } else { value })
}

/// Integer literal with an explicit suffix, negative values as `-` followed
/// by the magnitude.
pub fn suffixed(value: i128, suffix: &str) -> TokenStream {
    let magnitude = LitInt::new(&format!("{}{suffix}", value.unsigned_abs()), Span::call_site());
    if value < 0 {
        quote!(-#magnitude)
    } else {
        magnitude.into_token_stream()
    }
}

fn float_literal(value: f64, text: String, suffix: &str) -> TokenStream {
    let magnitude = LitFloat::new(&format!("{text}{suffix}"), Span::call_site());
    if value.is_sign_negative() {
        quote!(-#magnitude)
    } else {
        magnitude.into_token_stream()
    }
}

macro_rules! integer_literal_token {
    ($($ty:ident),* $(,)?) => {$(
        impl LiteralToken for $ty {
            fn parse_literal(expr: &Expr) -> syn::Result<Self> {
                integer(expr, stringify!($ty))
            }

            fn literal(&self) -> TokenStream {
                suffixed(*self as i128, stringify!($ty))
            }
        }
    )*};
}

integer_literal_token!(i8, i16, i32, i64, u8, u16, u32, u64);

impl LiteralToken for f32 {
    fn parse_literal(expr: &Expr) -> syn::Result<Self> {
        let value = float(expr, "f32")? as f32;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::new_spanned(expr, "`f32` literal is out of range"))
        }
    }

    fn literal(&self) -> TokenStream {
        float_literal(f64::from(*self), format!("{:?}", self.abs()), "f32")
    }
}

impl LiteralToken for f64 {
    fn parse_literal(expr: &Expr) -> syn::Result<Self> {
        float(expr, "f64")
    }

    fn literal(&self) -> TokenStream {
        float_literal(*self, format!("{:?}", self.abs()), "f64")
    }
}

impl LiteralToken for bool {
    fn parse_literal(expr: &Expr) -> syn::Result<Self> {
        match strip(expr) {
            Expr::Lit(ExprLit { lit: Lit::Bool(lit), .. }) => Ok(lit.value),
            _ => Err(expected(expr, "bool")),
        }
    }

    fn literal(&self) -> TokenStream {
        let value = *self;
        quote!(#value)
    }
}

impl LiteralToken for char {
    fn parse_literal(expr: &Expr) -> syn::Result<Self> {
        match strip(expr) {
            Expr::Lit(ExprLit { lit: Lit::Char(lit), .. }) => Ok(lit.value()),
            _ => Err(expected(expr, "char")),
        }
    }

    fn literal(&self) -> TokenStream {
        Literal::character(*self).into_token_stream()
    }
}

impl LiteralToken for String {
    fn parse_literal(expr: &Expr) -> syn::Result<Self> {
        match strip(expr) {
            Expr::Lit(ExprLit { lit: Lit::Str(lit), .. }) => Ok(lit.value()),
            _ => Err(expected(expr, "str")),
        }
    }

    fn literal(&self) -> TokenStream {
        LitStr::new(self, Span::call_site()).into_token_stream()
    }

    fn exact_test(&self) -> TokenStream {
        let literal = self.literal();
        quote!(::core::convert::AsRef::<str>::as_ref(token) == #literal)
    }

    fn range_test(start: &Self, end: &Self) -> TokenStream {
        let (start, end) = (start.literal(), end.literal());
        quote!({
            let text = ::core::convert::AsRef::<str>::as_ref(token);
            text >= #start && text <= #end
        })
    }
}
