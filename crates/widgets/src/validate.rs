//! Construction-time checks shared by the widget engines, plus the template filling
//! those checks protect.

use snafu::ensure;

use super::error::{
    ConflictingModesSnafu, InvalidConfigSnafu, InvalidTemplateSnafu, StartOutOfRangeSnafu,
    WidgetResult,
};

const POSITIONAL: &str = "{}";

pub(crate) fn ensure_positional_pair(
    template: &str,
    template_name: &'static str,
    stage: &'static str,
) -> WidgetResult<()> {
    let found = template.matches(POSITIONAL).count();
    ensure!(
        found == 2,
        InvalidTemplateSnafu {
            stage,
            template_name,
            details: format!("expected exactly two '{{}}' placeholders, found {found}"),
        }
    );
    Ok(())
}

pub(crate) fn ensure_named_placeholders(
    template: &str,
    template_name: &'static str,
    names: &[&str],
    stage: &'static str,
) -> WidgetResult<()> {
    for name in names {
        ensure!(
            template.contains(&format!("{{{name}}}")),
            InvalidTemplateSnafu {
                stage,
                template_name,
                details: format!("missing '{{{name}}}' placeholder"),
            }
        );
    }
    Ok(())
}

pub(crate) fn ensure_start_in_range(
    start_from: usize,
    content_len: usize,
    stage: &'static str,
) -> WidgetResult<()> {
    ensure!(
        start_from <= content_len,
        StartOutOfRangeSnafu {
            stage,
            start_from,
            content_len,
        }
    );
    Ok(())
}

pub(crate) fn ensure_exclusive(
    first: (&'static str, bool),
    second: (&'static str, bool),
    stage: &'static str,
) -> WidgetResult<()> {
    ensure!(
        !(first.1 && second.1),
        ConflictingModesSnafu {
            stage,
            first: first.0,
            second: second.0,
        }
    );
    Ok(())
}

pub(crate) fn ensure_positive(value: usize, name: &str, stage: &'static str) -> WidgetResult<()> {
    ensure!(
        value > 0,
        InvalidConfigSnafu {
            stage,
            details: format!("'{name}' must be at least 1"),
        }
    );
    Ok(())
}

/// Substitutes `{}` placeholders left to right. Surplus placeholders stay verbatim.
pub(crate) fn fill_positional(template: &str, values: &[String]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut values = values.iter();
    let mut rest = template;

    while let Some(start) = rest.find(POSITIONAL) {
        rendered.push_str(&rest[..start]);
        match values.next() {
            Some(value) => rendered.push_str(value),
            None => rendered.push_str(POSITIONAL),
        }
        rest = &rest[start + POSITIONAL.len()..];
    }

    rendered.push_str(rest);
    rendered
}

/// Substitutes `{name}` placeholders in one pass, so substituted text is never
/// re-scanned.
pub(crate) fn fill_named(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let matched = values
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));

        match matched {
            Some((name, value)) => {
                rendered.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                rendered.push('{');
                rest = tail;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}
