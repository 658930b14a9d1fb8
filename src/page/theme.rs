use super::{Document, ElementRef};

/// Root attribute holding the active color theme.
pub const THEME_ATTRIBUTE: &str = "data-bs-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Only an exact `"dark"` goes to light; anything else, including a
    /// missing attribute, goes to dark.
    pub fn after_toggle(current: Option<&str>) -> Theme {
        match current {
            Some("dark") => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

/// Click handler flipping [`THEME_ATTRIBUTE`] on the document root.
#[derive(Debug, Clone)]
pub struct ThemeToggle {
    element: ElementRef,
}

impl ThemeToggle {
    pub fn new(element: ElementRef) -> Self {
        Self { element }
    }

    pub fn element(&self) -> ElementRef {
        self.element
    }

    pub fn on_click<D: Document>(&self, document: &mut D) {
        let current = document.root_attribute(THEME_ATTRIBUTE);
        let next = Theme::after_toggle(current.as_deref());
        tracing::debug!(from = ?current, to = next.as_str(), "theme toggled");
        document.set_root_attribute(THEME_ATTRIBUTE, next.as_str());
    }
}
