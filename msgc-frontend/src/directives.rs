//! `//msgp:` directives
//!
//! Directive lines come from the comments of a unit. Each line is split on
//! whitespace and its first token selects a handler. Dispatch runs in two
//! phases:
//!
//! - early handlers configure the builder and run before anything is built
//! - late handlers rewrite the finished declaration set before inlining
//!
//! A handler that fails aborts the run. Lines no handler claims are kept for
//! the per-method consumer of the printer (`//msgp:encode ignore Foo`).

use crate::builder::IrBuilder;
use crate::decl::TypeExpr;
use log::{info, warn};
use msgc_common::{GenConfig, GenError, Trail};
use msgc_ir::passes::substitute;
use msgc_ir::{BaseElem, DeclarationSet, Elem, Primitive, ShimMode};
use serde::{Deserialize, Serialize};

pub const DIRECTIVE_PREFIX: &str = "//msgp:";

/// Extract directive lines from raw comment text
pub fn yield_directives(comments: &[String]) -> Vec<String> {
    comments
        .iter()
        .flat_map(|comment| comment.lines())
        .filter_map(|line| line.trim().strip_prefix(DIRECTIVE_PREFIX))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

type EarlyHandler = fn(&[&str], &mut GenConfig, &Trail) -> Result<(), GenError>;

type LateHandler = fn(&[&str], &mut LateContext<'_>, &Trail) -> Result<(), GenError>;

/// What late handlers get to work on
pub struct LateContext<'a> {
    pub decls: &'a mut DeclarationSet,
    pub config: &'a mut GenConfig,
    pub builder: &'a IrBuilder<'a>,
}

fn early_handler(name: &str) -> Option<EarlyHandler> {
    match name {
        "tag" => Some(apply_tag),
        "pointer" => Some(apply_pointer),
        "newtime" => Some(apply_newtime),
        _ => None,
    }
}

fn late_handler(name: &str) -> Option<LateHandler> {
    match name {
        "shim" => Some(apply_shim),
        "replace" => Some(apply_replace),
        "ignore" => Some(apply_ignore),
        "compactfloats" => Some(apply_compactfloats),
        "clearomitted" => Some(apply_clearomitted),
        _ => None,
    }
}

/// Run the early handlers over `lines`; returns the lines left unclaimed
pub fn apply_early(lines: Vec<String>, config: &mut GenConfig, trail: &Trail) -> Result<Vec<String>, GenError> {
    let mut rest = Vec::with_capacity(lines.len());
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(handler) = tokens.first().and_then(|t| early_handler(t)) else {
            rest.push(line);
            continue;
        };
        handler(&tokens, config, &trail.with(tokens[0])).map_err(|e| e.in_directive(&line))?;
    }
    Ok(rest)
}

/// Run the late handlers over `lines`; returns the lines left unclaimed
pub fn apply_late(lines: Vec<String>, ctx: &mut LateContext<'_>, trail: &Trail) -> Result<Vec<String>, GenError> {
    let mut rest = Vec::with_capacity(lines.len());
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(handler) = tokens.first().and_then(|t| late_handler(t)) else {
            rest.push(line);
            continue;
        };
        handler(&tokens, ctx, &trail.with(tokens[0])).map_err(|e| e.in_directive(&line))?;
    }
    Ok(rest)
}

// tag <name>
fn apply_tag(tokens: &[&str], config: &mut GenConfig, trail: &Trail) -> Result<(), GenError> {
    if tokens.len() != 2 {
        warn!("{}: tag directive takes exactly one argument, found {}", trail, tokens.len() - 1);
        return Ok(());
    }
    info!("{}: reading field tags from {:?}", trail, tokens[1]);
    config.tag_name = Some(tokens[1].to_string());
    Ok(())
}

fn apply_pointer(_: &[&str], config: &mut GenConfig, trail: &Trail) -> Result<(), GenError> {
    info!("{}: using pointer receivers", trail);
    config.pointer_receiver = true;
    Ok(())
}

fn apply_newtime(_: &[&str], config: &mut GenConfig, trail: &Trail) -> Result<(), GenError> {
    info!("{}: using the -1 extension for time.Time", trail);
    config.new_time = true;
    Ok(())
}

// shim <Type> as:<Base> using:<to>/<from> [mode:cast|convert]
fn apply_shim(tokens: &[&str], ctx: &mut LateContext<'_>, trail: &Trail) -> Result<(), GenError> {
    if !(4..=5).contains(&tokens.len()) {
        return Err(GenError::invalid_directive(
            format!("shim directive should have 3 or 4 arguments; found {}", tokens.len() - 1),
            trail,
        ));
    }

    let (name, needs_ref) = match tokens[1].strip_prefix('*') {
        Some(name) => (name, true),
        None => (tokens[1], false),
    };
    let base_name = tokens[2].strip_prefix("as:").unwrap_or(tokens[2]);
    let using = tokens[3].strip_prefix("using:").unwrap_or(tokens[3]);
    let methods: Vec<&str> = using.split('/').collect();
    let [to_base, from_base] = methods[..] else {
        return Err(GenError::invalid_directive(
            format!("expected 2 using:{{}} methods; found {} ({:?})", methods.len(), tokens[3]),
            trail,
        ));
    };

    let mut base = BaseElem::ident(base_name);
    base.common.alias = Some(name.to_string());
    base.needs_ref = needs_ref;
    base.shim_to_base = Some(to_base.to_string());
    base.shim_from_base = Some(from_base.to_string());
    if let Some(mode) = tokens.get(4).copied() {
        base.shim_mode = match mode.strip_prefix("mode:").unwrap_or(mode) {
            "cast" => ShimMode::Cast,
            "convert" => ShimMode::Convert,
            other => {
                return Err(GenError::invalid_directive(
                    format!("invalid shim mode; found {}, expected 'cast' or 'convert'", other),
                    trail,
                ))
            }
        };
    }

    info!("{}: {} -> {}", trail, name, base_name);
    let replaced = substitute(ctx.decls, name, &Elem::Base(base), true);
    info!("{}: shimmed {} reference(s) to {}", trail, replaced, name);
    Ok(())
}

// replace <Type> with:<Name>
fn apply_replace(tokens: &[&str], ctx: &mut LateContext<'_>, trail: &Trail) -> Result<(), GenError> {
    if tokens.len() != 3 {
        return Err(GenError::invalid_directive(
            format!("replace directive should have only 2 arguments; found {}", tokens.len() - 1),
            trail,
        ));
    }
    let name = tokens[1];
    let replacement = tokens[2].strip_prefix("with:").unwrap_or(tokens[2]);
    let expr = TypeExpr::parse(replacement)
        .ok_or_else(|| GenError::invalid_directive(format!("cannot parse type {:?}", replacement), trail))?;

    let mut elem = ctx.builder.parse_expr(&expr, trail)?;
    if let Elem::Base(b) = &mut elem {
        b.convert = true;
        b.common.alias = Some(name.to_string());
        if b.value == Primitive::Ident {
            b.shim_to_base = Some(format!("(*{})", replacement));
            b.needs_ref = true;
        }
    }

    info!("{}: {} -> {}", trail, name, replacement);
    substitute(ctx.decls, name, &elem, false);
    Ok(())
}

// ignore <Type>...
fn apply_ignore(tokens: &[&str], ctx: &mut LateContext<'_>, trail: &Trail) -> Result<(), GenError> {
    if tokens.len() < 2 {
        warn!("{}: ignore directive without a target", trail);
        return Ok(());
    }
    for name in &tokens[1..] {
        if ctx.decls.contains(name) {
            info!("{}: ignoring {}", trail, name);
            ctx.config.suppressed.insert(name.to_string());
        } else {
            warn!("{}: {} is not a declared type", trail, name);
        }
    }
    Ok(())
}

fn apply_compactfloats(_: &[&str], ctx: &mut LateContext<'_>, trail: &Trail) -> Result<(), GenError> {
    info!("{}: using compact floats", trail);
    ctx.config.compact_floats = true;
    Ok(())
}

fn apply_clearomitted(_: &[&str], ctx: &mut LateContext<'_>, trail: &Trail) -> Result<(), GenError> {
    info!("{}: clearing omitted fields", trail);
    ctx.config.clear_omitted = true;
    Ok(())
}

/// Generation phase a per-method directive applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Encode,
    Decode,
    Size,
    Marshal,
    Unmarshal,
    Test,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        match name {
            "encode" => Some(Method::Encode),
            "decode" => Some(Method::Decode),
            "size" => Some(Method::Size),
            "marshal" => Some(Method::Marshal),
            "unmarshal" => Some(Method::Unmarshal),
            "test" => Some(Method::Test),
            _ => None,
        }
    }
}

/// `<method> <action> [args...]`, left for the printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassDirective {
    pub method: Method,
    pub action: String,
    pub args: Vec<String>,
}

impl PassDirective {
    pub fn parse(line: &str, trail: &Trail) -> Option<PassDirective> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [method, action, args @ ..] = tokens.as_slice() else {
            warn!("{}: empty directive: {:?}", trail, line);
            return None;
        };
        let Some(method) = Method::from_name(method) else {
            warn!("{}: unknown pass name: {:?}", trail, method);
            return None;
        };
        Some(PassDirective {
            method,
            action: action.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }
}

/// Parse the lines no handler claimed; malformed ones are logged and dropped
pub fn parse_pass_directives(lines: &[String], trail: &Trail) -> Vec<PassDirective> {
    lines
        .iter()
        .filter_map(|line| PassDirective::parse(line, trail))
        .collect()
}
