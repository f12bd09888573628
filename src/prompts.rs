pub const ANALYSIS_SYSTEM: &str = include_str!("../data/prompts/analysis_system.txt");
pub const ANALYSIS_USER: &str = include_str!("../data/prompts/analysis_user.txt");
pub const ANALYSIS_IMAGE: &str = include_str!("../data/prompts/analysis_image.txt");
pub const MODEL_CHECK: &str = include_str!("../data/prompts/model_check.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Meal: {{meal}}", &[("meal", "two eggs")]),
            "Meal: two eggs"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} and {{b}}", &[("a", "rice")]), "rice and {{b}}");
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!ANALYSIS_SYSTEM.is_empty());
        assert!(!ANALYSIS_USER.is_empty());
        assert!(!ANALYSIS_IMAGE.is_empty());
        assert!(!MODEL_CHECK.is_empty());
    }

    #[test]
    fn test_system_instruction_names_all_fields() {
        for field in ["food_name", "calories", "protein", "fat", "carbs"] {
            assert!(ANALYSIS_SYSTEM.contains(field), "missing {}", field);
        }
        assert!(ANALYSIS_SYSTEM.contains("verbatim"));
    }

    #[test]
    fn test_user_template_has_meal_placeholder() {
        assert!(ANALYSIS_USER.contains("{{meal}}"));
    }
}
