use std::collections::BTreeMap;

use anyhow::anyhow;

use super::{ElementRef, Event};

/// Tooltip widget API of the UI toolkit, keyed by the element a tooltip is attached to.
pub trait Tooltips {
    /// Attaches a tooltip to `element`. Returns `false` if it already had one.
    fn create(&mut self, element: ElementRef) -> bool;

    fn has_instance(&self, element: ElementRef) -> bool;

    fn get_or_create(&mut self, element: ElementRef) {
        if !self.has_instance(element) {
            self.create(element);
        }
    }

    /// Replaces the text shown inside the tooltip.
    fn set_content(&mut self, element: ElementRef, text: &str) -> anyhow::Result<()>;

    /// Hides the tooltip. Returns the hidden event when it was actually shown.
    fn hide(&mut self, element: ElementRef) -> Option<Event>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooltipState {
    /// `None` until content is replaced; the element's own title is shown meanwhile.
    pub content: Option<String>,
    pub visible: bool,
}

/// In-process tooltip toolkit.
#[derive(Debug, Default)]
pub struct TooltipRegistry {
    instances: BTreeMap<ElementRef, TooltipState>,
}

impl TooltipRegistry {
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn get(&self, element: ElementRef) -> Option<&TooltipState> {
        self.instances.get(&element)
    }

    pub fn content(&self, element: ElementRef) -> Option<&str> {
        self.get(element)?.content.as_deref()
    }

    pub fn show(&mut self, element: ElementRef) -> anyhow::Result<()> {
        let state = self
            .instances
            .get_mut(&element)
            .ok_or_else(|| anyhow!("no tooltip attached to {element:?}"))?;
        state.visible = true;
        Ok(())
    }
}

impl Tooltips for TooltipRegistry {
    fn create(&mut self, element: ElementRef) -> bool {
        if self.instances.contains_key(&element) {
            return false;
        }
        self.instances.insert(element, TooltipState::default());
        true
    }

    fn has_instance(&self, element: ElementRef) -> bool {
        self.instances.contains_key(&element)
    }

    fn set_content(&mut self, element: ElementRef, text: &str) -> anyhow::Result<()> {
        let state = self
            .instances
            .get_mut(&element)
            .ok_or_else(|| anyhow!("no tooltip attached to {element:?}"))?;
        state.content = Some(text.to_string());
        Ok(())
    }

    fn hide(&mut self, element: ElementRef) -> Option<Event> {
        let state = self.instances.get_mut(&element)?;
        if !state.visible {
            return None;
        }
        state.visible = false;
        Some(Event::TooltipHidden(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_fires_only_after_show() {
        let mut registry = TooltipRegistry::default();
        let el = ElementRef(4);
        assert!(registry.create(el));
        assert!(!registry.create(el));
        assert_eq!(registry.hide(el), None);

        registry.show(el).unwrap();
        assert_eq!(registry.hide(el), Some(Event::TooltipHidden(el)));
        assert_eq!(registry.hide(el), None);
    }

    #[test]
    fn missing_instance_errors() {
        let mut registry = TooltipRegistry::default();
        assert!(registry.set_content(ElementRef(0), "x").is_err());
        assert!(registry.show(ElementRef(0)).is_err());
        registry.get_or_create(ElementRef(0));
        registry.set_content(ElementRef(0), "x").unwrap();
        assert_eq!(registry.content(ElementRef(0)), Some("x"));
    }
}
