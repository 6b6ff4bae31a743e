//! Static code generation.
//!
//! Renders the current page into a standalone HTML/CSS/JS triple. The
//! output mirrors the canvas: absolutely positioned component shells with
//! per-component styles, plus a small bootstrap script that seeds global
//! state and fetches every defined API.

use crate::store::AppStore;
use std::fmt::Write as _;
use weft_core::model::{ApiEndpoint, ComponentKind, ComponentNode, GeneratedCode, Theme};

impl AppStore {
    /// Regenerate `generated_code` from the current page.
    pub fn generate_code(&mut self) {
        let Some(page) = self.current_page() else {
            return;
        };

        let title = page
            .seo
            .as_ref()
            .and_then(|seo| seo.title.clone())
            .unwrap_or_else(|| page.name.clone());
        let description = page
            .seo
            .as_ref()
            .and_then(|seo| seo.description.clone())
            .unwrap_or_default();

        let html = render_html(&title, &description, &self.components);
        let css = render_css(&self.settings.theme, &self.components);
        let javascript = render_js(&self.global_state, &self.apis);

        self.generated_code = GeneratedCode {
            html,
            css,
            javascript,
        };
        self.persist();
    }
}

fn render_html(title: &str, description: &str, components: &[ComponentNode]) -> String {
    let mut body = String::new();
    for component in components {
        let _ = writeln!(
            body,
            "        <div class=\"component component-{kind}\" style=\"position: absolute; left: {x}px; top: {y}px; width: {w}px; height: {h}px;\">\n            {markup}\n        </div>",
            kind = component.kind.as_str(),
            x = component.x,
            y = component.y,
            w = component.width,
            h = component.height,
            markup = component_markup(component),
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    <title>{title}</title>\n    <meta name=\"description\" content=\"{description}\">\n    <link rel=\"stylesheet\" href=\"styles.css\">\n</head>\n<body>\n    <div id=\"app\">\n{body}    </div>\n    <script src=\"script.js\"></script>\n</body>\n</html>"
    )
}

fn component_markup(component: &ComponentNode) -> String {
    let id = component.id.as_str();
    let text_prop = |key: &str, fallback: &str| {
        component
            .str_prop(key)
            .unwrap_or(fallback)
            .to_string()
    };
    match component.kind {
        ComponentKind::Button => format!(
            "<button data-component-id=\"{id}\">{}</button>",
            text_prop("label", "Button")
        ),
        ComponentKind::Input => format!(
            "<input data-component-id=\"{id}\" type=\"text\" placeholder=\"{}\" />",
            text_prop("placeholder", "")
        ),
        ComponentKind::Text => format!(
            "<div data-component-id=\"{id}\">{}</div>",
            text_prop("text", "Text")
        ),
        ComponentKind::Image => format!(
            "<img data-component-id=\"{id}\" src=\"{}\" alt=\"{}\" />",
            text_prop("src", ""),
            text_prop("alt", "")
        ),
        _ => format!("<div data-component-id=\"{id}\">Component</div>"),
    }
}

fn render_css(theme: &Theme, components: &[ComponentNode]) -> String {
    let mut out = format!(
        "/* Generated CSS */\n* {{\n    margin: 0;\n    padding: 0;\n    box-sizing: border-box;\n}}\n\nbody {{\n    font-family: {font};\n    background-color: {bg};\n    color: {text};\n}}\n\n#app {{\n    position: relative;\n    min-height: 100vh;\n}}\n\n.component {{\n    position: absolute;\n}}\n",
        font = theme.fonts.primary,
        bg = theme.colors.background,
        text = theme.colors.text,
    );
    for component in components {
        if component.style.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "\n[data-component-id=\"{}\"] {{",
            component.id.as_str()
        );
        for (key, value) in &component.style {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = writeln!(out, "    {}: {};", camel_to_kebab(key), rendered);
        }
        out.push('}');
        out.push('\n');
    }
    out
}

fn render_js(global_state: &serde_json::Map<String, serde_json::Value>, apis: &[ApiEndpoint]) -> String {
    let state = serde_json::to_string_pretty(&serde_json::Value::Object(global_state.clone()))
        .unwrap_or_else(|_| "{}".to_string());

    let mut loaders = String::new();
    for api in apis {
        let slug = api.name.to_lowercase().replace(char::is_whitespace, "_");
        let _ = write!(
            loaders,
            "        // {name}\n        try {{\n            const response = await fetch('{url}', {{ method: '{method}' }});\n            this.state.{slug} = await response.json();\n        }} catch (error) {{\n            console.error('Error loading {name}:', error);\n        }}\n",
            name = api.name,
            url = api.url,
            method = api.method.as_str(),
        );
    }

    format!(
        "// Generated JavaScript\nclass AppRuntime {{\n    constructor() {{\n        this.state = {state};\n        this.loadData();\n    }}\n\n    async loadData() {{\n{loaders}    }}\n}}\n\ndocument.addEventListener('DOMContentLoaded', () => {{\n    new AppRuntime();\n}});"
    )
}

/// `backgroundColor` → `background-color`.
fn camel_to_kebab(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::geometry::Point;
    use weft_core::id::EntityId;
    use serde_json::json;

    #[test]
    fn camel_to_kebab_cases() {
        assert_eq!(camel_to_kebab("backgroundColor"), "background-color");
        assert_eq!(camel_to_kebab("color"), "color");
        assert_eq!(camel_to_kebab("borderTopLeftRadius"), "border-top-left-radius");
    }

    #[test]
    fn generated_code_covers_components_and_apis() {
        let mut store = AppStore::in_memory();
        let id = store.place_component(ComponentKind::Button, Point::new(40.0, 20.0), 120.0, 40.0);
        store.update_component(id, |c| {
            c.props.insert("label".into(), json!("Go"));
            c.style.insert("backgroundColor".into(), json!("#3B82F6"));
        });
        let mut api = ApiEndpoint::new(EntityId::intern("users-api"), "Get Users");
        api.url = "https://api.example.com/users".into();
        store.add_api(api);

        store.generate_code();
        let code = &store.generated_code;
        assert!(code.html.contains(">Go</button>"));
        assert!(code.html.contains("left: 40px"));
        assert!(code.css.contains("background-color: #3B82F6;"));
        assert!(code.javascript.contains("https://api.example.com/users"));
        assert!(code.javascript.contains("this.state.get_users"));
    }
}
