//! Static `class` extraction and `:class` binding.

use stampa_armature::helpers::{get_and_remove_attr, get_binding_attr, quote_json};
use stampa_armature::parse_text;
use stampa_relief::{CompileModule, ElementNode, TransformContext};

pub struct ClassModule;

impl CompileModule for ClassModule {
    fn transform(&self, el: &mut ElementNode, cx: &mut TransformContext<'_>) {
        if let Some(static_class) = get_and_remove_attr(el, "class", false) {
            if parse_text(&static_class, cx.options.delimiter_pair()).is_some() {
                cx.warn(
                    format!(
                        "class=\"{}\": Interpolation inside attributes has been removed. \
                         Use v-bind or the colon shorthand instead. For example, \
                         instead of <div class=\"{{{{ val }}}}\">, use <div :class=\"val\">.",
                        static_class
                    ),
                    el.attr_range("class"),
                );
            }
            let condensed = static_class.split_whitespace().collect::<Vec<_>>().join(" ");
            if !condensed.is_empty() {
                el.static_class = Some(quote_json(&condensed).into());
            }
        }
        if let Some(binding) = get_binding_attr(el, "class", false) {
            el.class_binding = Some(binding.into());
        }
    }

    fn gen_data(&self, el: &ElementNode) -> std::string::String {
        let mut data = std::string::String::new();
        if let Some(static_class) = &el.static_class {
            data.push_str(&format!("staticClass:{},", static_class));
        }
        if let Some(binding) = &el.class_binding {
            data.push_str(&format!("class:{},", binding));
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_relief::CompilerOptions;

    fn transformed(template_attrs: &[(&str, &str)]) -> Box<ElementNode> {
        use stampa_armature::build_template;
        let mut options = CompilerOptions::default();
        options.modules = vec![std::sync::Arc::new(ClassModule)];
        let mut cx = TransformContext::new(&options);
        let attrs: Vec<_> = template_attrs
            .iter()
            .map(|(n, v)| format!("{}=\"{}\"", n, v))
            .collect();
        build_template(&format!("<div {}/>", attrs.join(" ")), &options, &mut cx).expect("root")
    }

    #[test]
    fn test_static_class_is_quoted_and_condensed() {
        let el = transformed(&[("class", "  a   b ")]);
        assert_eq!(el.static_class.as_deref(), Some("\"a b\""));
    }

    #[test]
    fn test_class_binding_goes_through_filters() {
        let el = transformed(&[(":class", "cls | upper")]);
        assert_eq!(el.class_binding.as_deref(), Some("_f(\"upper\")(cls)"));
    }

    #[test]
    fn test_gen_data_emits_both() {
        let el = transformed(&[("class", "box"), (":class", "extra")]);
        assert_eq!(
            ClassModule.gen_data(&el),
            "staticClass:\"box\",class:extra,"
        );
    }

    #[test]
    fn test_interpolation_in_static_class_warns() {
        let mut options = CompilerOptions::default();
        options.modules = vec![std::sync::Arc::new(ClassModule)];
        let mut cx = TransformContext::new(&options);
        stampa_armature::build_template("<div class=\"{{ c }}\"/>", &options, &mut cx);
        assert!(cx
            .diagnostics
            .iter()
            .any(|d| d.error.message.contains("Interpolation inside attributes")));
    }
}
