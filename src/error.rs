/// Errors raised while fetching and normalizing site content.
///
/// The ingestion layer never swallows these; handlers decide whether to
/// log, render an empty page or redirect to the not-found page.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("workbook decode error: {0}")]
    Decode(String),

    #[error("sheet with name {0} not found")]
    SheetNotFound(String),

    #[error("malformed data in sheet {sheet}, row {row}: {source}")]
    MalformedData {
        sheet: String,
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("email delivery failed: {0}")]
    Email(String),
}

impl ContentError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn malformed(sheet: impl Into<String>, row: usize, source: serde_json::Error) -> Self {
        Self::MalformedData {
            sheet: sheet.into(),
            row,
            source,
        }
    }

    pub fn email(msg: impl Into<String>) -> Self {
        Self::Email(msg.into())
    }
}

impl From<zip::result::ZipError> for ContentError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<quick_xml::Error> for ContentError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ContentError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
