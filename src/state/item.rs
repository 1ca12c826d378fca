use std::collections::BTreeMap;

/// Opaque field mapping produced by the page classifier
pub type ResultData = BTreeMap<String, serde_json::Value>;

/// One query to run, as loaded from the input file
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Stable identity assigned at load time (source row index)
    pub idx: i64,

    pub brand: String,

    pub model: String,

    /// Purchase price from the input, if present and numeric
    pub buy_price: Option<f64>,
}

impl Item {
    pub fn new(idx: i64, brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            idx,
            brand: brand.into(),
            model: model.into(),
            buy_price: None,
        }
    }

    pub fn with_buy_price(mut self, buy_price: Option<f64>) -> Self {
        self.buy_price = buy_price;
        self
    }

    /// Search query: trimmed brand and model joined by a space, empty parts dropped
    pub fn query(&self) -> String {
        [self.brand.trim(), self.model.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Recorded outcome for one item in one run
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub idx: i64,
    pub query: String,
    pub ok: bool,
    pub data: ResultData,
    pub http_status: Option<u16>,
    pub note: String,
}

impl ItemResult {
    /// A successful fetch with classified page data
    pub fn success(idx: i64, query: impl Into<String>, data: ResultData) -> Self {
        Self {
            idx,
            query: query.into(),
            ok: true,
            data,
            http_status: Some(200),
            note: String::new(),
        }
    }

    /// A failed attempt, explained by `note`
    pub fn failure(
        idx: i64,
        query: impl Into<String>,
        http_status: Option<u16>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            idx,
            query: query.into(),
            ok: false,
            data: ResultData::new(),
            http_status,
            note: note.into(),
        }
    }
}
