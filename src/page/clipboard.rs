use super::{Document, ElementRef, Tooltips};

pub const COPY_LABEL: &str = "Copy to clipboard";
pub const COPIED_LABEL: &str = "Copied!";

/// Fire-and-forget clipboard write.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// The operating system clipboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text)?;
        Ok(())
    }
}

/// Clipboard that records every write.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.writes.push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Element(ElementRef),
    Literal(String),
}

/// Text state of the copy tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipText {
    Default,
    Confirming,
}

impl TooltipText {
    pub fn label(self) -> &'static str {
        match self {
            TooltipText::Default => COPY_LABEL,
            TooltipText::Confirming => COPIED_LABEL,
        }
    }
}

/// Copy button: copies the payload and confirms through its tooltip until the
/// tooltip is hidden again.
#[derive(Debug, Clone)]
pub struct ClipboardCopy {
    trigger: ElementRef,
    payload: Payload,
    state: TooltipText,
}

impl ClipboardCopy {
    pub fn new(trigger: ElementRef, payload: Payload) -> Self {
        Self {
            trigger,
            payload,
            state: TooltipText::Default,
        }
    }

    pub fn trigger(&self) -> ElementRef {
        self.trigger
    }

    pub fn state(&self) -> TooltipText {
        self.state
    }

    pub fn payload_text<D: Document>(&self, document: &D) -> String {
        match &self.payload {
            Payload::Element(source) => document.text_content(*source),
            Payload::Literal(text) => text.clone(),
        }
    }

    pub fn on_click<D: Document, C: Clipboard, T: Tooltips>(
        &mut self,
        document: &D,
        clipboard: &mut C,
        tooltips: &mut T,
    ) {
        self.transition(tooltips, TooltipText::Confirming);

        let text = self.payload_text(document);
        // Rejections are not surfaced to the user.
        if let Err(e) = clipboard.write_text(&text) {
            tracing::warn!(error = %format!("{e:#}"), "clipboard write failed");
        } else {
            tracing::debug!(bytes = text.len(), "copied to clipboard");
        }
    }

    pub fn on_hidden<T: Tooltips>(&mut self, tooltips: &mut T) {
        self.transition(tooltips, TooltipText::Default);
    }

    fn transition<T: Tooltips>(&mut self, tooltips: &mut T, next: TooltipText) {
        self.state = next;
        if let Err(e) = tooltips.set_content(self.trigger, next.label()) {
            tracing::warn!(error = %format!("{e:#}"), "copy tooltip missing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TooltipRegistry;

    struct DeniedClipboard;

    impl Clipboard for DeniedClipboard {
        fn write_text(&mut self, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("permission denied")
        }
    }

    struct NoDocument;

    impl Document for NoDocument {
        fn root_attribute(&self, _name: &str) -> Option<String> {
            None
        }
        fn set_root_attribute(&mut self, _name: &str, _value: &str) {}
        fn element_by_id(&self, _id: &str) -> Option<ElementRef> {
            None
        }
        fn elements_with_attribute(&self, _name: &str, _value: &str) -> Vec<ElementRef> {
            Vec::new()
        }
        fn text_content(&self, _element: ElementRef) -> String {
            String::new()
        }
    }

    #[test]
    fn denied_clipboard_still_confirms() {
        let trigger = ElementRef(1);
        let mut tooltips = TooltipRegistry::default();
        tooltips.get_or_create(trigger);
        let mut copy = ClipboardCopy::new(trigger, Payload::Literal("hello world".to_string()));

        copy.on_click(&NoDocument, &mut DeniedClipboard, &mut tooltips);
        assert_eq!(copy.state(), TooltipText::Confirming);
        assert_eq!(tooltips.content(trigger), Some(COPIED_LABEL));

        copy.on_hidden(&mut tooltips);
        assert_eq!(copy.state(), TooltipText::Default);
        assert_eq!(tooltips.content(trigger), Some(COPY_LABEL));
    }

    #[test]
    fn missing_tooltip_does_not_block_copy() {
        let mut tooltips = TooltipRegistry::default();
        let mut clipboard = MemoryClipboard::default();
        let mut copy = ClipboardCopy::new(ElementRef(9), Payload::Literal("hello world".to_string()));

        copy.on_click(&NoDocument, &mut clipboard, &mut tooltips);
        assert_eq!(clipboard.writes(), ["hello world".to_string()]);
        assert_eq!(tooltips.instance_count(), 0);
    }
}
