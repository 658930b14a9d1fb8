use kuchiki::NodeRef;
use kuchiki::iter::NodeIterator as _;
use kuchiki::traits::TendrilSink as _;

use super::ElementRef;

/// The slice of a DOM the page behaviors need.
pub trait Document {
    fn root_attribute(&self, name: &str) -> Option<String>;
    fn set_root_attribute(&mut self, name: &str, value: &str);
    fn element_by_id(&self, id: &str) -> Option<ElementRef>;
    /// Elements whose `name` attribute equals `value`, in document order.
    fn elements_with_attribute(&self, name: &str, value: &str) -> Vec<ElementRef>;
    fn text_content(&self, element: ElementRef) -> String;
}

/// A parsed HTML document. Element handles index its elements in document order.
pub struct HtmlDocument {
    elements: Vec<NodeRef>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let elements = kuchiki::parse_html()
            .one(html)
            .descendants()
            .elements()
            .map(|e| e.as_node().clone())
            .collect();
        Self { elements }
    }

    fn root(&self) -> Option<&NodeRef> {
        // html5ever always synthesizes <html>, so the first element is the root.
        self.elements.first()
    }
}

impl Document for HtmlDocument {
    fn root_attribute(&self, name: &str) -> Option<String> {
        let element = self.root()?.as_element()?;
        element.attributes.borrow().get(name).map(str::to_string)
    }

    fn set_root_attribute(&mut self, name: &str, value: &str) {
        if let Some(element) = self.root().and_then(|node| node.as_element()) {
            element.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.elements
            .iter()
            .position(|node| attribute(node, "id").as_deref() == Some(id))
            .map(ElementRef)
    }

    fn elements_with_attribute(&self, name: &str, value: &str) -> Vec<ElementRef> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, node)| attribute(node, name).as_deref() == Some(value))
            .map(|(idx, _)| ElementRef(idx))
            .collect()
    }

    fn text_content(&self, element: ElementRef) -> String {
        self.elements
            .get(element.0)
            .map(NodeRef::text_contents)
            .unwrap_or_default()
    }
}

fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()?
        .attributes
        .borrow()
        .get(name)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_attribute_is_read_and_written_on_html_element() {
        let mut doc = HtmlDocument::parse(r#"<html data-x="1"><body><p id="a">hi <b>there</b></p></body></html>"#);
        assert_eq!(doc.root_attribute("data-x").as_deref(), Some("1"));
        doc.set_root_attribute("data-x", "2");
        assert_eq!(doc.root_attribute("data-x").as_deref(), Some("2"));
        doc.set_root_attribute("data-y", "new");
        assert_eq!(doc.root_attribute("data-y").as_deref(), Some("new"));

        let p = doc.element_by_id("a").unwrap();
        assert_eq!(doc.text_content(p), "hi there");
        assert_eq!(doc.element_by_id("missing"), None);
    }

    #[test]
    fn attribute_query_is_exact() {
        let doc = HtmlDocument::parse(
            r#"<i data-t="tooltip"></i><i data-t="tooltips"></i><i data-t="tooltip"></i>"#,
        );
        assert_eq!(doc.elements_with_attribute("data-t", "tooltip").len(), 2);
    }
}
