use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::builtin;
use crate::lookup::{Attribute, ReferenceAttributes};
use crate::page::{COPY_LABEL, PageConfig, PayloadSource};

pub struct ResultPage<'a> {
    pub citation: &'a str,
    pub attributes: &'a ReferenceAttributes,
    pub config: &'a PageConfig,
}

pub fn build_html(page: &ResultPage<'_>) -> String {
    let title = match page.attributes.get(Attribute::Title) {
        "" => "url2ref".to_string(),
        t => format!("{t} · url2ref"),
    };
    let source_url = page.attributes.get(Attribute::Url);
    let config = page.config;

    let markup: Markup = html! {
        (DOCTYPE)
        html lang="en" data-bs-theme="light" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href=(builtin::BOOTSTRAP_CSS);
                style { (PreEscaped(builtin::BUILTIN_CSS)) }
            }
            body {
                nav class="navbar bg-body-tertiary" {
                    div class="container" {
                        span class="navbar-brand" { "url2ref" }
                        button type="button" id=(config.theme_toggle) class="btn btn-outline-secondary btn-sm"
                            data-bs-toggle="tooltip" data-bs-placement="bottom" title="Toggle light/dark theme" {
                            "Theme"
                        }
                    }
                }
                main class="container my-4" {
                    h1 class="h4" { "Reference" }
                    @if !source_url.is_empty() {
                        p class="text-body-secondary" {
                            "Generated from "
                            a href=(source_url) rel="noreferrer noopener" { (source_url) }
                        }
                    }
                    div class="card u2r-ref-card" {
                        div class="card-body" {
                            (reference_box(page.citation, &config.payload))
                            button type="button" id=(config.copy_trigger) class="btn btn-primary"
                                data-bs-toggle="tooltip" data-bs-placement="top" title=(COPY_LABEL) {
                                "Copy"
                            }
                        }
                    }
                    h2 class="h5 mt-4" { "Details" }
                    table class="table table-sm u2r-details" {
                        tbody {
                            @for (attribute, value) in page.attributes.iter() {
                                tr {
                                    th scope="row" { (attribute.label()) }
                                    td { (value) }
                                }
                            }
                        }
                    }
                }
                script src=(builtin::BOOTSTRAP_JS) {}
                script { (PreEscaped(builtin::page_script(config))) }
            }
        }
    };
    markup.into_string()
}

fn reference_box(citation: &str, payload: &PayloadSource) -> Markup {
    match payload {
        PayloadSource::Element(id) => html! {
            pre id=(id) class="u2r-ref" { (citation) }
        },
        PayloadSource::Literal(_) => html! {
            pre class="u2r-ref" { (citation) }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page;

    fn attributes() -> ReferenceAttributes {
        let mut a = ReferenceAttributes::default();
        a.set(Attribute::Url, "https://example.com/a");
        a.set(Attribute::Title, "<Hello>");
        a
    }

    #[test]
    fn rendered_page_passes_wiring_check() {
        let attrs = attributes();
        let config = PageConfig::default();
        let html = build_html(&ResultPage {
            citation: "{{cite web |title=<Hello> }}",
            attributes: &attrs,
            config: &config,
        });
        assert!(html.contains("&lt;Hello&gt;"));
        assert!(html.contains(r#"id="rawTextBox""#));
        page::check_page(&html, &config, "{{cite web |title=<Hello> }}").unwrap();
    }

    #[test]
    fn literal_payload_page() {
        let attrs = attributes();
        let config = PageConfig::with_literal_payload("hello world");
        let html = build_html(&ResultPage {
            citation: "{{cite web }}",
            attributes: &attrs,
            config: &config,
        });
        assert!(!html.contains("rawTextBox"));
        assert!(html.contains(r#"id="clipboard-button""#));
        page::check_page(&html, &config, "hello world").unwrap();
    }
}
