//! Listing page → `ListingRecord`.
//!
//! Every field is filled by an ordered list of named strategies. A strategy is a
//! plain function over a pre-parsed `ListingPage` and returns `None` when its
//! landmark is missing; the first `Some` wins and later strategies are not run.
//! A field with no winning strategy keeps the `NOT_FOUND` sentinel.

use crate::scraper::models::{Extraction, ListingRecord};
use crate::scraper::text::{first_integer, non_empty, normalize_text, truncate_chars};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

const DESCRIPTION_MAX_CHARS: usize = 3000;

/// A parsed listing page plus the views most strategies need.
pub struct ListingPage {
    pub doc: Html,
    /// `<title>` text, normalized.
    pub title: String,
    /// Whole `<body>` text, normalized.
    pub text: String,
    /// `label: value` pairs from the parameter list block.
    pub params: Vec<(String, String)>,
}

impl ListingPage {
    pub fn parse(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let title = select_text(&doc, "title").unwrap_or_default();
        let text = select_first(&doc, "body")
            .map(|body| normalize_text(&element_text(body)))
            .unwrap_or_else(|| normalize_text(&element_text(doc.root_element())));
        let params = parse_params(&doc);
        Self {
            doc,
            title,
            text,
            params,
        }
    }

    /// Value of the first parameter whose label starts with `label` (case-insensitive).
    pub fn param(&self, label: &str) -> Option<&str> {
        let wanted = label.to_lowercase();
        self.params
            .iter()
            .find(|(l, _)| l.to_lowercase().starts_with(&wanted))
            .map(|(_, v)| v.as_str())
    }
}

pub type Strategy = fn(&ListingPage) -> Option<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PropertyType,
    Neighborhood,
    Price,
    Area,
    Floor,
    ListingDate,
    ConstructionType,
    ConstructionYear,
    Features,
    Seller,
    SellerPhone,
    Description,
    Condition,
}

impl Field {
    fn slot<'r>(&self, record: &'r mut ListingRecord) -> &'r mut String {
        match self {
            Field::PropertyType => &mut record.property_type,
            Field::Neighborhood => &mut record.neighborhood,
            Field::Price => &mut record.price_amount,
            Field::Area => &mut record.area_amount,
            Field::Floor => &mut record.floor,
            Field::ListingDate => &mut record.listing_date,
            Field::ConstructionType => &mut record.construction_type,
            Field::ConstructionYear => &mut record.construction_year,
            Field::Features => &mut record.features,
            Field::Seller => &mut record.seller,
            Field::SellerPhone => &mut record.seller_phone,
            Field::Description => &mut record.description,
            Field::Condition => &mut record.condition,
        }
    }
}

pub struct Rule {
    pub field: Field,
    pub strategies: &'static [(&'static str, Strategy)],
}

/// Extraction rules, in the order they run.
pub const RULES: &[Rule] = &[
    Rule {
        field: Field::PropertyType,
        strategies: &[
            ("header_block", property_type_from_header),
            ("title_tag", property_type_from_title),
        ],
    },
    Rule {
        field: Field::Neighborhood,
        strategies: &[
            ("location_block", neighborhood_from_location),
            ("breadcrumb", neighborhood_from_breadcrumb),
        ],
    },
    Rule {
        field: Field::Price,
        strategies: &[
            ("title_tag", price_from_title),
            ("price_block", price_from_block),
        ],
    },
    Rule {
        field: Field::Area,
        strategies: &[
            ("params_block", area_from_params),
            ("page_text", area_from_text),
        ],
    },
    Rule {
        field: Field::Floor,
        strategies: &[
            ("params_block", floor_from_params),
            ("page_text", floor_from_text),
        ],
    },
    Rule {
        field: Field::ConstructionType,
        strategies: &[
            ("params_block", construction_type_from_params),
            ("page_text", construction_type_from_text),
        ],
    },
    Rule {
        field: Field::ConstructionYear,
        strategies: &[
            ("params_block", construction_year_from_params),
            ("page_text", construction_year_from_text),
        ],
    },
    Rule {
        field: Field::ListingDate,
        strategies: &[("date_line", listing_date_from_text)],
    },
    Rule {
        field: Field::SellerPhone,
        strategies: &[
            ("phone_block", phone_from_block),
            ("page_text", phone_from_text),
        ],
    },
    Rule {
        field: Field::Description,
        strategies: &[
            ("description_id", description_by_id),
            ("description_class", description_by_class),
            ("meta_description", description_from_meta),
        ],
    },
    Rule {
        field: Field::Features,
        strategies: &[("extras_list", features_from_extras)],
    },
    Rule {
        field: Field::Condition,
        strategies: &[("keywords", condition_from_keywords)],
    },
    Rule {
        field: Field::Seller,
        strategies: &[
            ("agency_block", seller_from_agency_block),
            ("private_seller", seller_private_marker),
        ],
    },
];

/// Run every rule over `html`. Never fails: misses stay at the sentinel.
pub fn extract_listing(url: &str, html: &str) -> Extraction {
    let mut record = ListingRecord::for_url(url);
    let page = ListingPage::parse(html);

    for rule in RULES {
        if let Some((name, value)) = run_rule(rule, &page) {
            debug!(field = ?rule.field, strategy = name, "field extracted");
            *rule.field.slot(&mut record) = value;
        }
    }

    let anchored = has_listing_anchor(&page);
    Extraction {
        record,
        success: anchored,
        error: (!anchored).then(|| "no header, price or parameter block found".to_string()),
    }
}

/// First strategy of `rule` that yields a value, with its name.
pub fn run_rule(rule: &Rule, page: &ListingPage) -> Option<(&'static str, String)> {
    rule.strategies
        .iter()
        .find_map(|(name, strategy)| strategy(page).map(|v| (*name, v)))
}

fn has_listing_anchor(page: &ListingPage) -> bool {
    property_type_from_header(page).is_some()
        || price_from_title(page).is_some()
        || !page.params.is_empty()
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

/// Normalized text of the first element matching `css`, if it has any.
fn select_text(doc: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .find_map(|el| non_empty(&element_text(el)))
}

fn select_all_text(doc: &Html, css: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|el| non_empty(&element_text(el)))
        .collect()
}

const PARAM_BLOCKS: &[&str] = &["div.adParams", "ul.imotData", "div.params", "table.params"];

fn parse_params(doc: &Html) -> Vec<(String, String)> {
    let Ok(items) = Selector::parse("div, li, tr") else {
        return Vec::new();
    };

    for block_css in PARAM_BLOCKS {
        let Some(block) = select_first(doc, block_css) else {
            continue;
        };

        let pairs: Vec<(String, String)> = block
            .select(&items)
            .filter_map(|item| {
                let text = normalize_text(&element_text(item));
                let (label, value) = text.split_once(':')?;
                let label = label.trim();
                let value = value.trim();
                (!label.is_empty() && !value.is_empty())
                    .then(|| (label.to_string(), value.to_string()))
            })
            .collect();

        if !pairs.is_empty() {
            return pairs;
        }
    }

    Vec::new()
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| non_empty(m.as_str()))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// "Продава 1-СТАЕН" → "1-СТАЕН".
fn strip_offer_verb(text: &str) -> Option<String> {
    let stripped = ["Продава ", "Продажба на ", "Продажба "]
        .iter()
        .find_map(|verb| text.strip_prefix(verb))
        .unwrap_or(text);
    non_empty(stripped)
}

pub fn property_type_from_header(page: &ListingPage) -> Option<String> {
    let header = select_text(&page.doc, "div.advHeader h1")
        .or_else(|| select_text(&page.doc, "div.title h1"))
        .or_else(|| select_text(&page.doc, "h1"))?;
    strip_offer_verb(&header)
}

pub fn property_type_from_title(page: &ListingPage) -> Option<String> {
    let first = page.title.split(',').next()?;
    if !first.to_lowercase().contains("продава") {
        return None;
    }
    strip_offer_verb(first.trim())
}

/// Last comma-separated part of "гр. Варна, Бриз".
fn last_location_part(text: &str) -> Option<String> {
    text.rsplit(',').find_map(non_empty)
}

pub fn neighborhood_from_location(page: &ListingPage) -> Option<String> {
    let location = select_text(&page.doc, "div.advHeader .location")
        .or_else(|| select_text(&page.doc, "div.location"))
        .or_else(|| select_text(&page.doc, "span.location"))?;
    last_location_part(&location)
}

pub fn neighborhood_from_breadcrumb(page: &ListingPage) -> Option<String> {
    for css in ["div.breadcrumb a", "nav.breadcrumb a", "ul.breadcrumb li"] {
        let crumbs = select_all_text(&page.doc, css);
        if let Some(last) = crumbs.last() {
            return last_location_part(last);
        }
    }
    None
}

static PRICE_RE: OnceLock<Regex> = OnceLock::new();

pub fn price_from_title(page: &ListingPage) -> Option<String> {
    let re = cached(&PRICE_RE, r"(?i)(\d[\d \u{a0}]*)\s*(?:EUR|€|лв)");
    let caps = re.captures(&page.title)?;
    first_integer(caps.get(1)?.as_str())
}

pub fn price_from_block(page: &ListingPage) -> Option<String> {
    let block = select_text(&page.doc, "#cena")
        .or_else(|| select_text(&page.doc, "div.price"))
        .or_else(|| select_text(&page.doc, "span.price"))?;
    first_integer(&block)
}

pub fn area_from_params(page: &ListingPage) -> Option<String> {
    first_integer(page.param("Площ")?)
}

static AREA_RE: OnceLock<Regex> = OnceLock::new();

pub fn area_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(&AREA_RE, r"(?i)Площ\s*:?\s*(\d+)");
    capture(re, &page.text)
}

pub fn floor_from_params(page: &ListingPage) -> Option<String> {
    non_empty(page.param("Етаж")?)
}

static FLOOR_RE: OnceLock<Regex> = OnceLock::new();

pub fn floor_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(&FLOOR_RE, r"(?i)Етаж\s*:?\s*(\d+(?:-\w+)?(?:\s+от\s+\d+)?|партер)");
    capture(re, &page.text)
}

static CONSTRUCTION_RE: OnceLock<Regex> = OnceLock::new();

fn construction_kind(text: &str) -> Option<String> {
    let re = cached(
        &CONSTRUCTION_RE,
        r"(?i)\b(тухла|панел|епк|пк|гредоред|монолит|ст\.?\s*бетон)\b",
    );
    capture(re, text)
}

pub fn construction_type_from_params(page: &ListingPage) -> Option<String> {
    let value = page.param("Строителство")?;
    construction_kind(value).or_else(|| {
        // "Тухла, 2008 г." → "Тухла" when the material is not one we know.
        let head = value.split(',').next()?;
        non_empty(head).filter(|h| first_integer(h).is_none())
    })
}

pub fn construction_type_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(&CONSTRUCTION_TEXT_RE, r"(?i)Строителство\s*:?\s*([^,.:]{2,30})");
    capture(re, &page.text).and_then(|v| construction_kind(&v))
}

static CONSTRUCTION_TEXT_RE: OnceLock<Regex> = OnceLock::new();
static YEAR_RE: OnceLock<Regex> = OnceLock::new();

fn year_in(text: &str) -> Option<String> {
    let re = cached(&YEAR_RE, r"\b((?:19|20)\d{2})\b");
    capture(re, text)
}

pub fn construction_year_from_params(page: &ListingPage) -> Option<String> {
    page.param("Година")
        .and_then(year_in)
        .or_else(|| page.param("Строителство").and_then(year_in))
}

static YEAR_TEXT_RE: OnceLock<Regex> = OnceLock::new();

pub fn construction_year_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(
        &YEAR_TEXT_RE,
        r"(?i)(?:Строителство|Година на строителство)\s*:?[^0-9]{0,30}((?:19|20)\d{2})",
    );
    capture(re, &page.text)
}

static DATE_RE: OnceLock<Regex> = OnceLock::new();

pub fn listing_date_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(
        &DATE_RE,
        r"(?i)(?:Публикувана|Редактирана|Коригирана)\s+(?:в\s+)?(?:\d{1,2}:\d{2}\s+(?:ч\.?\s+)?)?на\s+(\d{1,2}\s+\p{L}+,?\s+\d{4})",
    );
    capture(re, &page.text)
}

/// Keep digits and a leading plus.
fn clean_phone(raw: &str) -> Option<String> {
    let mut out = String::new();
    for c in raw.trim().chars() {
        if c.is_ascii_digit() || (c == '+' && out.is_empty()) {
            out.push(c);
        }
    }
    (out.trim_start_matches('+').len() >= 6).then_some(out)
}

pub fn phone_from_block(page: &ListingPage) -> Option<String> {
    if let Ok(tel) = Selector::parse("a[href^='tel:']") {
        if let Some(href) = page
            .doc
            .select(&tel)
            .find_map(|a| a.value().attr("href"))
        {
            if let Some(phone) = clean_phone(href.trim_start_matches("tel:")) {
                return Some(phone);
            }
        }
    }

    let block = select_text(&page.doc, "div.phone")
        .or_else(|| select_text(&page.doc, "span.phone"))?;
    let re = cached(&PHONE_RE, PHONE_PATTERN);
    re.find(&block).and_then(|m| clean_phone(m.as_str()))
}

static PHONE_RE: OnceLock<Regex> = OnceLock::new();
// +359 or a leading 0, then 8-9 digits with optional space/dash separators.
const PHONE_PATTERN: &str = r"(?:\+359|\b0)[\s\-]?\d(?:[\s\-]?\d){7,8}";

pub fn phone_from_text(page: &ListingPage) -> Option<String> {
    let re = cached(&PHONE_RE, PHONE_PATTERN);
    re.find(&page.text).and_then(|m| clean_phone(m.as_str()))
}

fn description_text(text: String) -> Option<String> {
    (text.chars().count() >= 10).then(|| truncate_chars(&text, DESCRIPTION_MAX_CHARS))
}

pub fn description_by_id(page: &ListingPage) -> Option<String> {
    select_text(&page.doc, "#description_div").and_then(description_text)
}

pub fn description_by_class(page: &ListingPage) -> Option<String> {
    select_text(&page.doc, "div.advDescription")
        .or_else(|| select_text(&page.doc, "div.description"))
        .and_then(description_text)
}

pub fn description_from_meta(page: &ListingPage) -> Option<String> {
    let selector =
        Selector::parse("meta[name='description'], meta[property='og:description']").ok()?;
    page.doc
        .select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .find_map(non_empty)
        .and_then(description_text)
}

pub fn features_from_extras(page: &ListingPage) -> Option<String> {
    for css in ["div.carExtri div", "div.carExtri li", "ul.extras li", "div.features li"] {
        let items = select_all_text(&page.doc, css);
        if !items.is_empty() {
            return Some(items.join(", "));
        }
    }
    None
}

static CONDITION_RE: OnceLock<Regex> = OnceLock::new();

pub fn condition_from_keywords(page: &ListingPage) -> Option<String> {
    let re = cached(
        &CONDITION_RE,
        r"(?i)\b(необзаведен|полуобзаведен|обзаведен|акт\s*1[456]|в строеж|на зелено|завършен|след ремонт|за ремонт)\b",
    );

    let mut haystack = page
        .params
        .iter()
        .map(|(l, v)| format!("{l}: {v}"))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(features) = features_from_extras(page) {
        haystack.push(' ');
        haystack.push_str(&features);
    }

    let mut found: Vec<String> = Vec::new();
    for m in re.find_iter(&haystack) {
        let word = m.as_str().to_lowercase();
        if !found.contains(&word) {
            found.push(word);
        }
    }
    (!found.is_empty()).then(|| found.join(", "))
}

pub fn seller_from_agency_block(page: &ListingPage) -> Option<String> {
    ["div.AG strong", "div.agency .name", "div.broker .name", ".seller-name"]
        .iter()
        .find_map(|css| select_text(&page.doc, css))
}

pub fn seller_private_marker(page: &ListingPage) -> Option<String> {
    page.text
        .to_lowercase()
        .contains("частно лице")
        .then(|| "Частно лице".to_string())
}
