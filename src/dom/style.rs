//! Effective style derived from inline declarations.
//!
//! Only the three properties that decide whether text is perceivable are
//! modelled. Anything unparseable falls back to the CSS initial value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
    Collapse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: Visibility,
    pub opacity: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        ComputedStyle { display: "inline".to_string(), visibility: Visibility::Visible, opacity: 1.0 }
    }
}

impl ComputedStyle {
    pub(crate) fn from_declarations(decls: &[(String, String)]) -> Self {
        let mut style = ComputedStyle::default();
        for (property, value) in decls {
            let value = value.trim_end_matches("!important").trim().to_ascii_lowercase();
            match property.as_str() {
                "display" => style.display = value,
                "visibility" => {
                    style.visibility = match value.as_str() {
                        "hidden" => Visibility::Hidden,
                        "collapse" => Visibility::Collapse,
                        _ => Visibility::Visible,
                    }
                }
                "opacity" => style.opacity = parse_opacity(&value).unwrap_or(1.0),
                _ => {}
            }
        }
        style
    }

    pub fn display_none(&self) -> bool {
        self.display == "none"
    }

    pub fn transparent(&self) -> bool {
        self.opacity <= 0.0
    }
}

/// Parse `0.5` or `50%`, clamped to `0.0..=1.0`.
fn parse_opacity(value: &str) -> Option<f32> {
    let v = match value.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => value.parse::<f32>().ok()?,
    };
    if v.is_nan() { None } else { Some(v.clamp(0.0, 1.0)) }
}

/// Split a `style` attribute value into `(property, value)` pairs.
pub(crate) fn parse_declarations(source: &str) -> Vec<(String, String)> {
    let mut decls: Vec<(String, String)> = Vec::new();
    for decl in source.split(';') {
        let Some((property, value)) = decl.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        if property.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        match decls.iter_mut().find(|(p, _)| *p == property) {
            Some((_, v)) => *v = value,
            None => decls.push((property, value)),
        }
    }
    decls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(source: &str) -> ComputedStyle {
        ComputedStyle::from_declarations(&parse_declarations(source))
    }

    #[test]
    fn defaults_are_visible() {
        let s = style("");
        assert!(!s.display_none());
        assert_eq!(s.visibility, Visibility::Visible);
        assert!(!s.transparent());
    }

    #[test]
    fn reads_hiding_properties() {
        assert!(style("display: none").display_none());
        assert!(style("DISPLAY:None !important").display_none());
        assert_eq!(style("visibility: collapse").visibility, Visibility::Collapse);
        assert!(style("opacity: 0").transparent());
        assert!(style("opacity: 0%").transparent());
        assert!(!style("opacity: 0.01").transparent());
    }

    #[test]
    fn later_declarations_win() {
        assert!(!style("display: none; display: block").display_none());
    }

    #[test]
    fn garbage_falls_back_to_initial_values() {
        let s = style("opacity: lots; ;: x; visibility");
        assert!(!s.transparent());
        assert_eq!(s.visibility, Visibility::Visible);
    }
}
