use std::borrow::Cow;

use indexmap::IndexMap;
use regex::Regex;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};

use crate::pipeline::ReplaceOptions;

/// Token substitution on module source.
///
/// A key only matches as a whole identifier path: not preceded or followed by
/// an identifier character, and not followed by `.`. With
/// `prevent_assignment`, a key followed by `=` (but not `==`) is left alone.
#[derive(Debug, Clone)]
pub(crate) struct ReplacePlugin {
    pattern: Option<Regex>,
    values: IndexMap<String, String>,
    prevent_assignment: bool,
}

impl ReplacePlugin {
    pub(crate) fn new(options: &ReplaceOptions) -> anyhow::Result<Self> {
        let mut keys: Vec<&str> = options
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| !k.is_empty())
            .collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()));

        let pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?:{alternation})"))?)
        };

        Ok(Self {
            pattern,
            values: options.values.clone(),
            prevent_assignment: options.prevent_assignment,
        })
    }

    /// Replaced source, or `None` when nothing matched.
    pub(crate) fn replace(&self, code: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        let mut out = String::with_capacity(code.len());
        let mut last = 0;
        let mut pos = 0;

        while let Some(m) = pattern.find_at(code, pos) {
            let value = self.values.get(m.as_str());
            match value {
                Some(value) if self.accepts(code, m.start(), m.end()) => {
                    out.push_str(&code[last..m.start()]);
                    out.push_str(value);
                    last = m.end();
                    pos = m.end();
                }
                _ => {
                    pos = code[m.start()..]
                        .chars()
                        .next()
                        .map_or(code.len(), |c| m.start() + c.len_utf8());
                }
            }
            if pos >= code.len() {
                break;
            }
        }

        if last == 0 {
            return None;
        }
        out.push_str(&code[last..]);
        Some(out)
    }

    fn accepts(&self, code: &str, start: usize, end: usize) -> bool {
        if code[..start].chars().next_back().is_some_and(is_ident_char) {
            return false;
        }
        let rest = &code[end..];
        if rest.chars().next().is_some_and(|c| is_ident_char(c) || c == '.') {
            return false;
        }
        if self.prevent_assignment {
            let after = rest.trim_start();
            if after.starts_with('=') && !after[1..].starts_with('=') {
                return false;
            }
        }
        true
    }
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric() || c >= '\u{A0}'
}

impl Plugin for ReplacePlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-pack:replace".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let replaced = self.replace(args.code);
        let id = args.id.to_string();

        async move {
            let Some(code) = replaced else {
                return Ok(None);
            };
            tracing::trace!(id = %id, "Replaced tokens");
            Ok(Some(HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
