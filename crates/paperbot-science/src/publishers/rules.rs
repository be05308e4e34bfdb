use super::{DoiLocator, PublisherRule};

/// Dispatch table, in priority order.
pub static RULES: &[PublisherRule] = &[
    PublisherRule {
        name: "ScienceDirect",
        matchers: &["www.sciencedirect.com"],
        abstract_selectors: &[
            ".u-margin-s-bottom#sp0010",
            ".u-margin-s-bottom#sp0040",
            ".u-margin-s-bottom#abspara0010",
            ".u-margin-s-bottom#sp0075",
            ".u-margin-s-bottom#sp0015",
            ".u-margin-s-bottom#sp0050",
        ],
        doi: DoiLocator::Href("a.anchor.doi.anchor-primary"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Frontiers",
        matchers: &["www.frontiersin.org"],
        abstract_selectors: &[".mb0", ".JournalAbstract__AcceptedArticle"],
        doi: DoiLocator::TextContaining("a, p, span, li", "doi"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Springer Nature",
        matchers: &["link.springer.com", "www.nature.com", "bmcpsychiatry.biomedcentral.com"],
        abstract_selectors: &["#Abs1-content"],
        doi: DoiLocator::TextContaining(".c-bibliographic-information__value", "doi"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Taylor & Francis",
        matchers: &["www.tandfonline.com"],
        abstract_selectors: &["p.last"],
        doi: DoiLocator::Text("li.dx-doi"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "SAGE",
        matchers: &["journals.sagepub.com"],
        abstract_selectors: &["div[role=\"paragraph\"]"],
        doi: DoiLocator::Href("a[property=\"sameAs\"]"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Hogrefe",
        matchers: &["econtent.hogrefe.com"],
        abstract_selectors: &["div.abstractSection.abstractInFull"],
        doi: DoiLocator::Href("a.epub-section__doi__text"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Wiley",
        matchers: &["onlinelibrary.wiley.com", "el.wiley.com"],
        abstract_selectors: &["div.article-section__content.en.main"],
        doi: DoiLocator::Href("a.epub-doi"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Liebert",
        matchers: &["www.liebertpub.com"],
        abstract_selectors: &["section#abstract"],
        doi: DoiLocator::Href("a[property=\"sameAs\"]"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "APA PsycNet",
        matchers: &["psycnet.apa.org"],
        abstract_selectors: &["abstract p", "div.col-md-12.p-0"],
        doi: DoiLocator::LastDoiLink,
        title_selector: None,
        requires_browser: true,
    },
    PublisherRule {
        name: "MDPI",
        matchers: &["www.mdpi.com"],
        abstract_selectors: &["div.html-p"],
        doi: DoiLocator::FirstDoiLink,
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Oxford Academic",
        matchers: &["academic.oup.com"],
        abstract_selectors: &["p.chapter-para"],
        doi: DoiLocator::FirstDoiLink,
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "J Neurosci",
        matchers: &["www.jneurosci.org"],
        abstract_selectors: &["p#p-5"],
        doi: DoiLocator::Text("span.highwire-cite-metadata-doi.highwire-cite-metadata"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "MIT Press",
        matchers: &["direct.mit.edu"],
        abstract_selectors: &["section.abstract"],
        doi: DoiLocator::FirstDoiLink,
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "PNAS",
        matchers: &["www.pnas.org"],
        abstract_selectors: &["div#abstracts"],
        doi: DoiLocator::Href("a[property=\"sameAs\"]"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "PubMed Central",
        matchers: &["pmc.ncbi.nlm.nih.gov"],
        abstract_selectors: &["section.abstract#abstract1"],
        doi: DoiLocator::Href("a.usa-link.usa-link--external"),
        title_selector: None,
        requires_browser: false,
    },
    PublisherRule {
        name: "Stork",
        matchers: &["www.storkapp.me"],
        abstract_selectors: &["p#abstractHolder"],
        doi: DoiLocator::FirstDoiLink,
        title_selector: Some("h1.h3"),
        requires_browser: false,
    },
];
