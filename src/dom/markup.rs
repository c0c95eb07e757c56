//! Markup serialisation for reports and assertions.

use super::{Document, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr"];

pub(super) fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(slot) = doc.nodes.get(id.0 as usize) else {
        return;
    };
    match &slot.kind {
        NodeKind::Text(text) => escape_into(text, false, out),
        NodeKind::Element(data) => {
            out.push('<');
            out.push_str(&data.tag);
            for (name, value) in &data.attributes {
                push_attribute(name, value, out);
            }
            if let Some(decls) = data.style.as_ref().filter(|d| !d.is_empty()) {
                let joined = decls.iter().map(|(p, v)| format!("{p}: {v}")).collect::<Vec<_>>().join("; ");
                push_attribute("style", &joined, out);
            }
            out.push('>');
            if VOID_TAGS.contains(&data.tag.as_str()) {
                return;
            }
            for &child in &slot.children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&data.tag);
            out.push('>');
        }
    }
}

fn push_attribute(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    if value.is_empty() {
        return;
    }
    out.push_str("=\"");
    escape_into(value, true, out);
    out.push('"');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p).unwrap();
        doc.set_attribute(p, "title", "a \"b\" & c").unwrap();
        doc.set_attribute(p, "hidden", "").unwrap();
        let t = doc.create_text("1 < 2 & 3 > 0");
        doc.append_child(p, t).unwrap();

        assert_eq!(doc.outer_html(p), r#"<p title="a &quot;b&quot; &amp; c" hidden>1 &lt; 2 &amp; 3 &gt; 0</p>"#);
    }

    #[test]
    fn serialises_style_and_void_elements() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let br = doc.create_element("br");
        doc.append_child(doc.root(), div).unwrap();
        doc.append_child(div, br).unwrap();
        doc.set_attribute(div, "style", "display:none; opacity: 0").unwrap();

        assert_eq!(doc.inner_html(doc.root()), r#"<div style="display: none; opacity: 0"><br></div>"#);
    }
}
