//! Templates for pull request and issue descriptions.
//!
//! Bodies are rendered from `{placeholder}` templates in a single pass, the
//! same way for every artifact. Offense listings are pre-rendered as Markdown
//! and substituted in.
//!
//! # Public API
//! - [`Templates`] / [`TEMPLATES`]: the artifact body templates
//! - [`TemplateContext`]: values available to placeholders
//! - [`render_template`]: placeholder substitution
//! - [`pull_request_body`] / [`issue_body`]: the two rendered descriptions

use crate::core::lint::{LintResult, Offense};
use std::fmt::Write;
use std::path::Path;

/// Upper bound on listed offenses; GitHub rejects bodies over 65536 chars.
const MAX_LISTED_OFFENSES: usize = 200;

pub struct Templates {
    pub pull_request: &'static str,
    pub issue: &'static str,
}

pub static TEMPLATES: Templates = Templates {
    pull_request: "## Linter auto-corrections\n\
        \n\
        This pull request applies the linter's safe and unsafe auto-corrections to `{repository}`.\n\
        \n\
        **Auto-corrected: {auto_count}, Manual Review Needed: {manual_count}**\n\
        \n\
        ### Corrected offenses\n\
        \n\
        {auto_offenses}\n\
        {manual_note}",
    issue: "## Linter offenses requiring manual review\n\
        \n\
        The linter reported offenses in `{repository}` that cannot be corrected automatically.\n\
        \n\
        **Manual Review Needed: {manual_count}**\n\
        \n\
        {manual_offenses}",
};

#[derive(Debug, Default)]
pub struct TemplateContext<'a> {
    pub repository: Option<&'a str>,
    pub auto_count: Option<usize>,
    pub manual_count: Option<usize>,
    pub auto_offenses: Option<&'a str>,
    pub manual_offenses: Option<&'a str>,
    pub manual_note: Option<&'a str>,
}

/// Substitute `{placeholder}`s. Unknown placeholders are kept verbatim and
/// known ones without a value render empty.
pub fn render_template(template: &str, context: &TemplateContext) -> String {
    let estimated_capacity = template.len()
        + context.auto_offenses.map_or(0, str::len)
        + context.manual_offenses.map_or(0, str::len)
        + context.manual_note.map_or(0, str::len)
        + 64;
    let mut output = String::with_capacity(estimated_capacity);
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            output.push(ch);
            continue;
        }

        let mut placeholder = String::new();
        let mut found_closing = false;
        for next_ch in chars.by_ref() {
            if next_ch == '}' {
                found_closing = true;
                break;
            }
            placeholder.push(next_ch);
        }

        if !found_closing {
            output.push('{');
            output.push_str(&placeholder);
            continue;
        }

        match placeholder.as_str() {
            "repository" => output.push_str(context.repository.unwrap_or("")),
            "auto_count" => push_count(&mut output, context.auto_count),
            "manual_count" => push_count(&mut output, context.manual_count),
            "auto_offenses" => output.push_str(context.auto_offenses.unwrap_or("")),
            "manual_offenses" => output.push_str(context.manual_offenses.unwrap_or("")),
            "manual_note" => output.push_str(context.manual_note.unwrap_or("")),
            _ => {
                output.push('{');
                output.push_str(&placeholder);
                output.push('}');
            }
        }
    }

    output
}

fn push_count(output: &mut String, count: Option<usize>) {
    if let Some(count) = count {
        let _ = write!(output, "{count}");
    }
}

/// Markdown bullet list of offenses, capped at [`MAX_LISTED_OFFENSES`].
pub fn offense_list<'a>(offenses: impl Iterator<Item = (&'a Path, &'a Offense)>) -> String {
    let mut list = String::new();
    let mut omitted = 0usize;

    for (index, (path, offense)) in offenses.enumerate() {
        if index >= MAX_LISTED_OFFENSES {
            omitted += 1;
            continue;
        }
        let _ = writeln!(
            list,
            "- `{}:{}:{}` **{}** ({}): {}",
            path.display(),
            offense.location.line,
            offense.location.column,
            offense.rule,
            offense.severity,
            offense.message.replace('\n', " ")
        );
    }

    if omitted > 0 {
        let _ = writeln!(list, "- ...and {omitted} more");
    }
    if list.is_empty() {
        list.push_str("_None._\n");
    }
    list
}

pub fn pull_request_body(repository: &str, result: &LintResult) -> String {
    let auto_offenses = offense_list(result.auto_correctable_offenses());
    let manual_count = result.manual_only_count();
    let manual_note = if manual_count > 0 {
        format!(
            "\n{manual_count} offense(s) need manual review and are tracked in a separate issue.\n"
        )
    } else {
        String::new()
    };

    render_template(
        TEMPLATES.pull_request,
        &TemplateContext {
            repository: Some(repository),
            auto_count: Some(result.auto_correctable_count()),
            manual_count: Some(manual_count),
            auto_offenses: Some(&auto_offenses),
            manual_note: Some(&manual_note),
            ..Default::default()
        },
    )
}

pub fn issue_body(repository: &str, result: &LintResult) -> String {
    let manual_offenses = offense_list(result.manual_offenses());
    render_template(
        TEMPLATES.issue,
        &TemplateContext {
            repository: Some(repository),
            manual_count: Some(result.manual_only_count()),
            manual_offenses: Some(&manual_offenses),
            ..Default::default()
        },
    )
}
