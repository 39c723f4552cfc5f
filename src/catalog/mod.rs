use serde::Deserialize;
use serde::Serialize;

/// One art-work entry of the catalog. Two records describe the same entry when
/// their `id`s match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    pub place_of_origin: String,
    pub artist_display: String,
    pub inscriptions: String,
    pub date_start: Option<i64>,
    pub date_end: Option<i64>,
}

/// One fetched page: the records in server order plus the total number of
/// records the server reports for the whole catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageBatch {
    pub records: Vec<Record>,
    pub total: u64,
}

impl PageBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A page shorter than the size it was requested with is the last one.
    pub fn is_exhausted(&self, page_size: u32) -> bool {
        self.records.len() < page_size as usize
    }
}

// the raw shape of the listing endpoint, every display field may come back null
#[derive(Debug, Deserialize)]
struct RawPage {
    data: Vec<RawRecord>,
    pagination: RawPagination,
}

#[derive(Debug, Deserialize)]
struct RawPagination {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: Option<u64>,
    title: Option<String>,
    place_of_origin: Option<String>,
    artist_display: Option<String>,
    inscriptions: Option<String>,
    date_start: Option<i64>,
    date_end: Option<i64>,
}

impl RawRecord {
    fn normalize(self, position: usize) -> Result<Record, String> {
        let id = self
            .id
            .ok_or_else(|| format!("record at position {position} has no id"))?;
        Ok(Record {
            id,
            title: self.title.unwrap_or_default(),
            place_of_origin: self.place_of_origin.unwrap_or_default(),
            artist_display: self.artist_display.unwrap_or_default(),
            inscriptions: self.inscriptions.unwrap_or_default(),
            date_start: self.date_start,
            date_end: self.date_end,
        })
    }
}

/// Turns a listing response body into a [`PageBatch`].
///
/// Fails when the body is not JSON, lacks the `data` array or the
/// `pagination.total` count, holds a record without an integer `id`, or
/// carries more than `page_size` records. The error is a human readable reason.
pub fn normalize_page(body: &[u8], page_size: u32) -> Result<PageBatch, String> {
    let raw: RawPage = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    if raw.data.len() > page_size as usize {
        return Err(format!(
            "expected at most {page_size} records, got {}",
            raw.data.len()
        ));
    }
    let records = raw
        .data
        .into_iter()
        .enumerate()
        .map(|(position, r)| r.normalize(position))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PageBatch {
        records,
        total: raw.pagination.total,
    })
}
