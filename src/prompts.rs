pub const SCENARIO: &str = include_str!("../data/prompts/scenario.txt");
pub const TRANSFORM: &str = include_str!("../data/prompts/transform.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.trim_end().to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
