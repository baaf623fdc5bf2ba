//! Fixed vocabularies used by the relevance classifier, the predicate builder
//! and the aggregator.

use crate::schema::DISPLACEMENT_STATUSES;
use lazy_static::lazy_static;
use regex::Regex;

/// Lowercase keywords whose presence marks a message as concerning the dataset.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "idp",
    "internally displaced",
    "displaced person",
    "returnee",
    "host community",
    "girls",
    "boys",
    "women",
    "men",
    "elderly",
    "population",
    "demographic",
    "state",
    "lga",
    "year",
    "response year",
    "pcode",
    "sector",
    "severity",
    "in need",
    "assistance",
    "data",
    "statistics",
    "count",
    "number of",
    "how many",
    "total",
    "report",
    "survey",
];

/// Known states and LGAs, in canonical casing.
pub const LOCATION_GAZETTEER: &[&str] = &[
    "Borno",
    "Lagos",
    "Adamawa",
    "Yobe",
    "Kano",
    "Maiduguri",
    "Jigawa",
    "Kaduna",
    "Fufore",
    "Yola North",
    "Yola South",
    "Mubi North",
    "Mubi South",
    "Michika",
    "Madagali",
    "Hong",
    "Gombi",
    "Bama",
    "Gwoza",
    "Konduga",
    "Jere",
    "Dikwa",
    "Monguno",
    "Ngala",
    "Damaturu",
    "Potiskum",
    "Geidam",
    "Gujba",
];

lazy_static! {
    pub static ref QUANTITY_PATTERN: Regex =
        Regex::new(r"(?i)\b(how many|count|number|total)\b").unwrap();
    pub static ref LOCATION_PHRASE_PATTERN: Regex =
        Regex::new(r"(?i)\b(in|at|from)\s+[a-zA-Z\s]+\b").unwrap();
    pub static ref YEAR_PATTERN: Regex = Regex::new(r"\b(\d{4})\b").unwrap();
    static ref GAZETTEER_PATTERN: Regex = {
        // Longest names first so "Yola North" wins over a shorter prefix.
        let mut names: Vec<&str> = LOCATION_GAZETTEER.to_vec();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let alternation: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
        Regex::new(&format!(r"(?i)\b({})\b", alternation.join("|"))).unwrap()
    };
    static ref CATEGORY_PATTERNS: Vec<(DemographicCategory, Regex)> = DemographicCategory::ALL
        .iter()
        .map(|c| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", c.keyword())).unwrap();
            (*c, re)
        })
        .collect();
}

/// First gazetteer location mentioned in the text (leftmost), in canonical casing.
pub fn find_location(text: &str) -> Option<&'static str> {
    let matched = GAZETTEER_PATTERN.find(text)?;
    LOCATION_GAZETTEER
        .iter()
        .find(|name| name.eq_ignore_ascii_case(matched.as_str()))
        .copied()
}

/// First 4-digit token in the text.
pub fn find_year(text: &str) -> Option<i64> {
    YEAR_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn contains_domain_keyword(text_lower: &str) -> bool {
    DOMAIN_KEYWORDS.iter().any(|k| text_lower.contains(k))
}

/// Demographic super-categories that roll up several disaggregated columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemographicCategory {
    Women,
    Men,
    Girls,
    Boys,
}

impl DemographicCategory {
    pub const ALL: [DemographicCategory; 4] = [
        DemographicCategory::Women,
        DemographicCategory::Men,
        DemographicCategory::Girls,
        DemographicCategory::Boys,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            DemographicCategory::Women => "women",
            DemographicCategory::Men => "men",
            DemographicCategory::Girls => "girls",
            DemographicCategory::Boys => "boys",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DemographicCategory::Women => "Women",
            DemographicCategory::Men => "Men",
            DemographicCategory::Girls => "Girls",
            DemographicCategory::Boys => "Boys",
        }
    }

    /// Columns summed into the composite total. Adults include the elderly band.
    pub fn columns(&self) -> Vec<String> {
        let groups: &[&str] = match self {
            DemographicCategory::Women => &["Women", "Elderly_Women"],
            DemographicCategory::Men => &["Men", "Elderly_Men"],
            DemographicCategory::Girls => &["Girls"],
            DemographicCategory::Boys => &["Boys"],
        };
        DISPLACEMENT_STATUSES
            .iter()
            .flat_map(|status| groups.iter().map(move |g| format!("{}_{}", status, g)))
            .collect()
    }

    /// Categories mentioned as whole words, in `ALL` order.
    pub fn mentioned_in(text: &str) -> Vec<DemographicCategory> {
        CATEGORY_PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(c, _)| *c)
            .collect()
    }
}
