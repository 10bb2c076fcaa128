//! Alert text templates
//!
//! Placeholders: `{value}`, `{field}`, `{topic}`, `{threshold}`. Unknown
//! placeholders are left as written.

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub value: f64,
    pub field: &'a str,
    pub topic: &'a str,
    pub threshold: f64,
}

/// Render `template` against `ctx`
pub fn render(template: &str, ctx: &TemplateContext<'_>) -> String {
    template
        .replace("{value}", &ctx.value.to_string())
        .replace("{field}", ctx.field)
        .replace("{topic}", ctx.topic)
        .replace("{threshold}", &ctx.threshold.to_string())
}
