use serde::Serialize;

use crate::page::{
    COPIED_LABEL, COPY_LABEL, PageConfig, PayloadSource, THEME_ATTRIBUTE, TOOLTIP_ATTRIBUTE,
};

pub const BUILTIN_CSS: &str = include_str!("builtin.css");

pub const BOOTSTRAP_CSS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";
pub const BOOTSTRAP_JS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptConfig<'a> {
    theme_toggle: &'a str,
    theme_attribute: &'a str,
    copy_trigger: &'a str,
    copy_source: Option<&'a str>,
    literal: Option<&'a str>,
    tooltip_selector: String,
    default_label: &'a str,
    confirm_label: &'a str,
}

const PAGE_SCRIPT: &str = r#"(function () {
  var config = __CONFIG__;
  var root = document.documentElement;

  var toggle = document.getElementById(config.themeToggle);
  if (toggle) {
    toggle.addEventListener("click", function () {
      if (root.getAttribute(config.themeAttribute) === "dark") {
        root.setAttribute(config.themeAttribute, "light");
      } else {
        root.setAttribute(config.themeAttribute, "dark");
      }
    });
  }

  document.querySelectorAll(config.tooltipSelector).forEach(function (el) {
    bootstrap.Tooltip.getOrCreateInstance(el);
  });

  var trigger = document.getElementById(config.copyTrigger);
  if (!trigger) return;
  var tooltip = bootstrap.Tooltip.getOrCreateInstance(trigger);

  trigger.addEventListener("hidden.bs.tooltip", function () {
    tooltip.setContent({ ".tooltip-inner": config.defaultLabel });
  });

  trigger.addEventListener("click", function () {
    tooltip.setContent({ ".tooltip-inner": config.confirmLabel });
    var source = config.copySource === null ? null : document.getElementById(config.copySource);
    var payload = source === null ? config.literal : source.textContent;
    navigator.clipboard.writeText(payload).catch(function (err) {
      console.warn("clipboard write failed", err);
    });
  });

  tooltip.hide();
})();"#;

/// Browser script wiring the theme toggle and copy button for `config`.
///
/// This is the browser counterpart of [`crate::page::Page`]; the wiring check
/// run before a page is written replays the Rust side, not this script.
pub fn page_script(config: &PageConfig) -> String {
    let (copy_source, literal) = match &config.payload {
        PayloadSource::Element(id) => (Some(id.as_str()), None),
        PayloadSource::Literal(text) => (None, Some(text.as_str())),
    };
    let (attr, value) = TOOLTIP_ATTRIBUTE;
    let script_config = ScriptConfig {
        theme_toggle: &config.theme_toggle,
        theme_attribute: THEME_ATTRIBUTE,
        copy_trigger: &config.copy_trigger,
        copy_source,
        literal,
        tooltip_selector: format!("[{attr}=\"{value}\"]"),
        default_label: COPY_LABEL,
        confirm_label: COPIED_LABEL,
    };
    // JSON is a valid JS expression; `</` must not close the surrounding <script>.
    let json = serde_json::to_string(&script_config)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");
    PAGE_SCRIPT.replace("__CONFIG__", &json)
}
