//! Progress styling for the spans packages are processed in.
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::style::ProgressStyle;

/// Styles `span` as a subtask of the span enclosing it.
pub fn set_sub_task(span: &Span, msg: &str) {
    span.pb_set_style(
        &ProgressStyle::with_template("  {span_child_prefix} {spinner:.blue} {wide_msg}")
            .unwrap_or(ProgressStyle::default_spinner()),
    );
    span.pb_set_message(msg);
}

/// A span for one package of a pass, shown as a spinner labelled `<verb> <package>`.
pub fn package_span(verb: &'static str, package: &str) -> Span {
    let span = tracing::info_span!("package", verb, package);
    set_sub_task(&span, &format!("{} {}", verb, package));
    span
}
