mod archive;
mod builtin;
mod cite;
mod cli;
mod fetcher;
mod html;
mod lookup;
mod metadata;
pub mod page;
mod progress;

use anyhow::Context as _;
use url::Url;

use archive::{Memento, WaybackClient};
use fetcher::Fetcher;
use page::{Clipboard as _, PageConfig, SystemClipboard};

pub use cite::Citation;
pub use cli::{Args as CliArgs, DEFAULT_USER_AGENT, ProgressMode};
pub use lookup::{Attribute, ReferenceAttributes};

/// Output of one run: the reference plus the attributes it was built from.
pub struct Reference {
    pub citation: Citation,
    pub attributes: ReferenceAttributes,
}

impl Reference {
    pub fn wiki_markup(&self) -> String {
        self.citation.to_string()
    }

    pub fn attribute(&self, attribute: Attribute) -> &str {
        self.attributes.get(attribute)
    }
}

pub async fn run(args: CliArgs) -> anyhow::Result<Reference> {
    use std::io::IsTerminal as _;

    let page_config = match &args.page_config {
        Some(path) => PageConfig::load(path)?,
        None => PageConfig::default(),
    };

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::Progress::new(progress_enabled);

    let fetcher = Fetcher::new(&args.user_agent, Some(progress.clone()))?;
    let res = generate(&args, &fetcher, &progress).await;
    let reference = match res {
        Ok(r) => r,
        Err(e) => {
            progress.finish();
            return Err(e);
        }
    };
    let wiki = reference.wiki_markup();

    if let Some(out_path) = &args.html {
        progress.set_stage("rendering page");
        let html = html::build_html(&html::ResultPage {
            citation: &wiki,
            attributes: &reference.attributes,
            config: &page_config,
        });
        page::check_page(&html, &page_config, page_config.expected_payload(&wiki))?;

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        std::fs::write(out_path, html).with_context(|| format!("write {}", out_path.display()))?;
        tracing::info!(path = %out_path.display(), "wrote result page");
    }

    if args.copy {
        match SystemClipboard.write_text(&wiki) {
            Ok(()) => {
                tracing::info!("reference copied to clipboard");
                progress.println(page::COPIED_LABEL);
            }
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "clipboard write failed"),
        }
    }

    progress.finish();
    Ok(reference)
}

async fn generate(
    args: &CliArgs,
    fetcher: &Fetcher,
    progress: &progress::Progress,
) -> anyhow::Result<Reference> {
    progress.set_stage("fetching page");
    let fetched = fetcher
        .get(args.url.clone())
        .await
        .with_context(|| format!("fetch {}", args.url))?;
    if let Some(ct) = fetched
        .headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !ct.contains("html") {
            tracing::warn!(content_type = ct, "response does not look like HTML");
        }
    }

    progress.set_stage("extracting metadata");
    let metadata = metadata::extract(&fetched.text(), &fetched.url);
    if metadata.is_empty() {
        tracing::warn!(url = %fetched.url, "no structured metadata found");
    }
    let mut attributes = ReferenceAttributes::from_metadata(&metadata, &fetched.url);
    if let Some(locale) = &args.locale {
        attributes.set(Attribute::Locale, locale.clone());
    }

    let memento = if args.no_archive {
        None
    } else {
        progress.set_stage("querying archive");
        lookup_archive(
            args.archive_endpoint.clone(),
            fetcher,
            attributes.get(Attribute::Url),
        )
        .await
    };

    let citation = Citation::new(&attributes, memento.as_ref());
    Ok(Reference {
        citation,
        attributes,
    })
}

/// Archive lookup failures only cost the archive fields.
async fn lookup_archive(endpoint: Url, fetcher: &Fetcher, url: &str) -> Option<Memento> {
    let client = WaybackClient::new(endpoint, fetcher);
    match client.earliest(url).await {
        Ok(Some(memento)) => {
            tracing::info!(memento = %memento.memento_url, "archived copy found");
            Some(memento)
        }
        Ok(None) => {
            tracing::info!(url, "no archived copy");
            None
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "archive lookup failed");
            None
        }
    }
}
