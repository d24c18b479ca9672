use serde::Serialize;

/// Marker stored in any field the extractor could not fill.
pub const NOT_FOUND: &str = "N/A";

/// Placeholder for a listing whose screenshot could not be captured or uploaded.
pub const SCREENSHOT_FAILED: &str = "Screenshot failed";

pub const UNKNOWN_DISTRICT: &str = "Неизвестен район";

/// Store columns A..R, in append order.
pub const COLUMN_HEADERS: [&str; 18] = [
    "Тип имот",
    "Квартал",
    "Цена",
    "Площ",
    "Цена/кв.м",
    "Етаж",
    "Дата на обявата",
    "Строителство",
    "Година на строителство",
    "Особености",
    "Продавач",
    "Телефон",
    "Описание",
    "Състояние",
    "Снимка",
    "Цена на сделката",
    "Коментари",
    "URL",
];

/// 1-based index of the column holding the listing's source URL (column R).
pub const SOURCE_URL_COLUMN: usize = 18;

// ListingRecord
//  ├── headline:   property_type, neighborhood
//  ├── numbers:    price_amount, area_amount, price_per_area (filled at flush)
//  ├── parameters: floor, construction_type, construction_year, condition
//  ├── text:       features, description, listing_date
//  ├── contact:    seller, seller_phone
//  └── manual:     screenshot_ref, deal_price, comments, source_url
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub property_type: String,
    pub neighborhood: String,
    pub price_amount: String,
    pub area_amount: String,
    pub price_per_area: String,
    pub floor: String,
    pub listing_date: String,
    pub construction_type: String,
    pub construction_year: String,
    pub features: String,
    pub seller: String,
    pub seller_phone: String,
    pub description: String,
    pub condition: String,
    pub screenshot_ref: String,
    pub deal_price: String,
    pub comments: String,
    pub source_url: String,
}

impl Default for ListingRecord {
    fn default() -> Self {
        let nf = || NOT_FOUND.to_string();
        Self {
            property_type: nf(),
            neighborhood: nf(),
            price_amount: nf(),
            area_amount: nf(),
            price_per_area: nf(),
            floor: nf(),
            listing_date: nf(),
            construction_type: nf(),
            construction_year: nf(),
            features: nf(),
            seller: nf(),
            seller_phone: nf(),
            description: nf(),
            condition: nf(),
            screenshot_ref: nf(),
            deal_price: nf(),
            comments: nf(),
            source_url: nf(),
        }
    }
}

impl ListingRecord {
    pub fn for_url(url: &str) -> Self {
        Self {
            source_url: url.trim().to_string(),
            ..Self::default()
        }
    }

    /// Price and area as numbers, only when both were extracted.
    pub fn numeric_price_and_area(&self) -> Option<(u64, u64)> {
        let price = self.price_amount.parse::<u64>().ok()?;
        let area = self.area_amount.parse::<u64>().ok()?;
        (area > 0).then_some((price, area))
    }

    /// The record as one store row, columns A..R.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.property_type.clone(),
            self.neighborhood.clone(),
            self.price_amount.clone(),
            self.area_amount.clone(),
            self.price_per_area.clone(),
            self.floor.clone(),
            self.listing_date.clone(),
            self.construction_type.clone(),
            self.construction_year.clone(),
            self.features.clone(),
            self.seller.clone(),
            self.seller_phone.clone(),
            self.description.clone(),
            self.condition.clone(),
            self.screenshot_ref.clone(),
            self.deal_price.clone(),
            self.comments.clone(),
            self.source_url.clone(),
        ]
    }
}

/// Result of running the extractor over one listing page.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ListingRecord,
    pub success: bool,
    pub error: Option<String>,
}

/// URL slug → district name, as used in the catalog search paths.
pub const KNOWN_DISTRICTS: &[(&str, &str)] = &[
    ("briz", "Бриз"),
    ("avtogara", "Автогара"),
    ("gratska-mahala", "Гръцка махала"),
    ("troshevo", "Трошево"),
    ("kaysieva-gradina", "Кайсиева градина"),
    ("m-t-evksinograd", "м-т Евксиноград"),
    ("asparuhovo", "Аспарухово"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSpec {
    pub url: String,
    pub district: String,
}

impl CatalogSpec {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            district: district_for_url(url),
        }
    }
}

/// Match path segments of a catalog URL against the known district slugs.
pub fn district_for_url(catalog_url: &str) -> String {
    let path = match url::Url::parse(catalog_url) {
        Ok(u) => u.path().to_string(),
        Err(_) => catalog_url.to_string(),
    };

    path.split('/')
        .filter(|s| !s.is_empty())
        .find_map(|segment| {
            KNOWN_DISTRICTS
                .iter()
                .find(|(slug, _)| segment.eq_ignore_ascii_case(slug))
                .map(|(_, name)| name.to_string())
        })
        .unwrap_or_else(|| UNKNOWN_DISTRICT.to_string())
}

/// The Varna catalogs crawled on every cycle.
pub const CATALOG_URLS: &[&str] = &[
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/briz/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5494~5500~5506~5510~5511~5513~5515~5517~5519~5520~5784~5840~6290~6291~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/avtogara/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5502~5505~5512~5516~5518~5784~5786~5847~6183~6186~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/gratska-mahala/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5848~6183~6185~6186~6292~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/troshevo/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5783~5787~5842~5843~5844~5850~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/kaysieva-gradina/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5782~5853~6289~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/m-t-evksinograd/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5040~5042~5053~5056~5493~6297~&sort=2",
    "https://www.imot.bg/obiavi/prodazhbi/grad-varna/asparuhovo/ednostaen/do-2022?type_home=2~3~4~5~6~8~&raioni=5496~&sort=2",
];

pub fn default_catalogs() -> Vec<CatalogSpec> {
    CATALOG_URLS.iter().map(|u| CatalogSpec::new(u)).collect()
}
