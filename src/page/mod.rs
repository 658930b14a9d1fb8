//! Interactive behaviors of the result page: the theme toggle and the
//! copy-to-clipboard button with its confirmation tooltip.
//!
//! The behaviors are written against three seams so they can run over any
//! document, clipboard and tooltip toolkit: [`Document`], [`Clipboard`] and
//! [`Tooltips`]. Handlers are registered once by [`Page::init`] and events are
//! delivered through [`Page::handle`].

mod clipboard;
mod dom;
mod theme;
mod toolkit;

use std::collections::HashMap;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub use clipboard::{
    COPIED_LABEL, COPY_LABEL, Clipboard, ClipboardCopy, MemoryClipboard, Payload, SystemClipboard,
    TooltipText,
};
pub use dom::{Document, HtmlDocument};
pub use theme::{THEME_ATTRIBUTE, Theme, ThemeToggle};
pub use toolkit::{TooltipRegistry, TooltipState, Tooltips};

/// Attribute (and value) marking elements that get a tooltip widget.
pub const TOOLTIP_ATTRIBUTE: (&str, &str) = ("data-bs-toggle", "tooltip");

/// Handle to an element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub usize);

/// Where the copy button takes its payload from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadSource {
    /// Text content of the element with this id.
    Element(String),
    /// A fixed string.
    Literal(String),
}

/// Maps page roles to element ids. Resolved once, at [`Page::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PageConfig {
    pub theme_toggle: String,
    pub copy_trigger: String,
    pub payload: PayloadSource,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            theme_toggle: "bd-theme".to_string(),
            copy_trigger: "copy-to-clipboard".to_string(),
            payload: PayloadSource::Element("rawTextBox".to_string()),
        }
    }
}

impl PageConfig {
    /// Button that copies a fixed string instead of reading a source element.
    pub fn with_literal_payload(text: impl Into<String>) -> Self {
        Self {
            copy_trigger: "clipboard-button".to_string(),
            payload: PayloadSource::Literal(text.into()),
            ..Self::default()
        }
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let config: Self =
            serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid page config {}", path.display()))?;
        Ok(config)
    }

    /// Each role needs an element of its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        let roles = self.role_ids();
        for (i, (role, id)) in roles.iter().enumerate() {
            if let Some((other, _)) = roles[i + 1..].iter().find(|(_, other_id)| other_id == id) {
                anyhow::bail!(
                    "roles {} and {} both use element #{id}",
                    role.name(),
                    other.name()
                );
            }
        }
        Ok(())
    }

    fn role_ids(&self) -> Vec<(Role, &str)> {
        let mut roles = vec![
            (Role::ThemeToggle, self.theme_toggle.as_str()),
            (Role::CopyTrigger, self.copy_trigger.as_str()),
        ];
        if let PayloadSource::Element(id) = &self.payload {
            roles.push((Role::CopySource, id.as_str()));
        }
        roles
    }

    /// What the copy button will place on the clipboard when the source element holds `source_text`.
    pub fn expected_payload<'a>(&'a self, source_text: &'a str) -> &'a str {
        match &self.payload {
            PayloadSource::Element(_) => source_text,
            PayloadSource::Literal(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ThemeToggle,
    CopyTrigger,
    CopySource,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::ThemeToggle => "theme-toggle",
            Role::CopyTrigger => "copy-trigger",
            Role::CopySource => "copy-source",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Click(ElementRef),
    /// The toolkit finished hiding the tooltip attached to this element.
    TooltipHidden(ElementRef),
}

#[derive(Debug, Clone, Copy)]
enum Handler {
    ToggleTheme,
    Copy,
}

pub struct Page<D, C, T> {
    document: D,
    clipboard: C,
    tooltips: T,
    theme: ThemeToggle,
    copy: ClipboardCopy,
    click_handlers: HashMap<ElementRef, Handler>,
}

impl<D: Document, C: Clipboard, T: Tooltips> Page<D, C, T> {
    /// Resolves roles, creates a tooltip for every opt-in element, forces the
    /// copy tooltip hidden and registers the click handlers.
    pub fn init(
        document: D,
        clipboard: C,
        mut tooltips: T,
        config: &PageConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let toggle = resolve(&document, Role::ThemeToggle, &config.theme_toggle)?;
        let trigger = resolve(&document, Role::CopyTrigger, &config.copy_trigger)?;
        let payload = match &config.payload {
            PayloadSource::Element(id) => {
                Payload::Element(resolve(&document, Role::CopySource, id)?)
            }
            PayloadSource::Literal(text) => Payload::Literal(text.clone()),
        };

        let (attr, value) = TOOLTIP_ATTRIBUTE;
        let opted_in = document.elements_with_attribute(attr, value);
        for element in &opted_in {
            tooltips.create(*element);
        }
        tracing::debug!(count = opted_in.len(), "tooltips created");

        tooltips.get_or_create(trigger);
        let copy = ClipboardCopy::new(trigger, payload);

        let mut page = Self {
            document,
            clipboard,
            tooltips,
            theme: ThemeToggle::new(toggle),
            copy,
            click_handlers: HashMap::from([
                (toggle, Handler::ToggleTheme),
                (trigger, Handler::Copy),
            ]),
        };
        page.dismiss_tooltip(trigger);
        Ok(page)
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Click(element) => match self.click_handlers.get(&element) {
                Some(Handler::ToggleTheme) => self.theme.on_click(&mut self.document),
                Some(Handler::Copy) => self.copy.on_click(
                    &self.document,
                    &mut self.clipboard,
                    &mut self.tooltips,
                ),
                None => tracing::trace!(?element, "click on element without handler"),
            },
            Event::TooltipHidden(element) if element == self.copy.trigger() => {
                self.copy.on_hidden(&mut self.tooltips);
            }
            Event::TooltipHidden(_) => {}
        }
    }

    /// Asks the toolkit to hide the tooltip on `element` and delivers the
    /// resulting hidden event, if any.
    pub fn dismiss_tooltip(&mut self, element: ElementRef) {
        if let Some(event) = self.tooltips.hide(element) {
            self.handle(event);
        }
    }

    pub fn theme_toggle(&self) -> ElementRef {
        self.theme.element()
    }

    pub fn copy_trigger(&self) -> ElementRef {
        self.copy.trigger()
    }

    pub fn tooltip_text(&self) -> TooltipText {
        self.copy.state()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn tooltips(&self) -> &T {
        &self.tooltips
    }

    pub fn tooltips_mut(&mut self) -> &mut T {
        &mut self.tooltips
    }
}

fn resolve<D: Document>(document: &D, role: Role, id: &str) -> anyhow::Result<ElementRef> {
    document
        .element_by_id(id)
        .with_context(|| format!("page has no element #{id} for role {}", role.name()))
}

/// Replays the page behaviors against rendered HTML: every role must resolve,
/// the copy button must copy `expected_payload` and confirm it, and the theme
/// toggle must flip the root attribute.
pub fn check_page(html: &str, config: &PageConfig, expected_payload: &str) -> anyhow::Result<()> {
    let document = HtmlDocument::parse(html);
    let initial_theme = document.root_attribute(THEME_ATTRIBUTE);
    let mut page = Page::init(
        document,
        MemoryClipboard::default(),
        TooltipRegistry::default(),
        config,
    )?;

    let trigger = page.copy_trigger();
    let (attr, value) = TOOLTIP_ATTRIBUTE;
    let opted_in = page.document().elements_with_attribute(attr, value);
    let expected = opted_in.len() + usize::from(!opted_in.contains(&trigger));
    if page.tooltips().instance_count() != expected {
        anyhow::bail!(
            "page check failed: {} tooltip instances for {} opt-in elements",
            page.tooltips().instance_count(),
            opted_in.len()
        );
    }

    page.tooltips_mut().show(trigger)?;
    page.handle(Event::Click(trigger));
    if page.clipboard().writes() != [expected_payload.to_string()] {
        anyhow::bail!("page check failed: copy button does not copy the reference");
    }
    if page.tooltips().content(trigger) != Some(COPIED_LABEL) {
        anyhow::bail!("page check failed: copy tooltip does not confirm the copy");
    }
    page.dismiss_tooltip(trigger);
    if page.tooltips().content(trigger) != Some(COPY_LABEL) {
        anyhow::bail!("page check failed: copy tooltip does not reset when hidden");
    }

    page.handle(Event::Click(page.theme_toggle()));
    let toggled = page.document().root_attribute(THEME_ATTRIBUTE);
    if toggled.as_deref() != Some(Theme::after_toggle(initial_theme.as_deref()).as_str()) {
        anyhow::bail!("page check failed: theme toggle did not flip {THEME_ATTRIBUTE}");
    }
    Ok(())
}
