//! Minimal reader for Office Open XML workbooks (`.xlsx`).
//!
//! An `.xlsx` file is a zip archive of XML parts. Only the parts needed to
//! turn sheets into header-keyed row records are read: the workbook sheet
//! list, its relationships, the shared string table and the sheet parts.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{ContentError, Result};

/// One spreadsheet row keyed by its column header.
pub type RowRecord = Map<String, Value>;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    fn into_json(self) -> Value {
        match self {
            CellValue::Text(text) => Value::String(text),
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    Value::from(n as i64)
                } else {
                    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
                }
            }
        }
    }

    fn as_header(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Bool(b) => b.to_string().to_uppercase(),
            CellValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }
}

/// A decoded sheet: rows of cells indexed by column, empty rows dropped.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    cells: Vec<Vec<Option<CellValue>>>,
}

impl Sheet {
    /// Rows after the header row, keyed by header text.
    pub fn rows(&self) -> Vec<RowRecord> {
        let mut rows = self.cells.iter();
        let headers = match rows.next() {
            Some(header_row) => unique_headers(
                header_row
                    .iter()
                    .map(|cell| {
                        cell.as_ref()
                            .map(CellValue::as_header)
                            .filter(|h| !h.is_empty())
                    })
                    .collect(),
            ),
            None => return Vec::new(),
        };

        rows.filter_map(|row| {
            let mut record = RowRecord::new();
            for (column, cell) in row.iter().enumerate() {
                let (Some(Some(header)), Some(value)) = (headers.get(column), cell) else {
                    continue;
                };
                record.insert(header.clone(), value.clone().into_json());
            }
            (!record.is_empty()).then_some(record)
        })
        .collect()
    }
}

/// Repeated headers get `_1`, `_2`, ... suffixes so no column is lost.
fn unique_headers(headers: Vec<Option<String>>) -> Vec<Option<String>> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .map(|header| {
            let header = header?;
            let mut name = header.clone();
            let mut suffix = 0;
            while seen.contains(&name) {
                suffix += 1;
                name = format!("{header}_{suffix}");
            }
            if suffix > 0 {
                debug!("Duplicate header {:?} renamed to {:?}", header, name);
            }
            seen.insert(name.clone());
            Some(name)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, Sheet)>,
}

impl Workbook {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| ContentError::decode("missing xl/workbook.xml"))?;
        let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?
            .ok_or_else(|| ContentError::decode("missing xl/_rels/workbook.xml.rels"))?;
        let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let targets = parse_relationships(&rels_xml)?;
        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_list(&workbook_xml)? {
            let Some(target) = targets.get(&rel_id) else {
                return Err(ContentError::decode(format!(
                    "sheet {name} references unknown relationship {rel_id}"
                )));
            };
            let path = resolve_target(target);
            let xml = read_part(&mut archive, &path)?
                .ok_or_else(|| ContentError::decode(format!("missing sheet part {path}")))?;
            sheets.push((name, parse_sheet(&xml, &shared)?));
        }

        debug!("Decoded workbook with {} sheets", sheets.len());
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, sheet)| sheet)
    }
}

fn read_part(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ContentError::decode(format!("reading {path}: {e}")))?;
    Ok(Some(xml))
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(e, b"name")?;
                let rel_id = attribute(e, b"id")?;
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id")?, attribute(e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Phonetic runs carry pronunciation hints, not cell text.
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_text && !in_phonetic => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Zero-based column index from an A1-style reference (`"AB12"` -> 27).
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .map(|n| n - 1)
}

#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    raw: Option<String>,
}

impl PendingCell {
    fn resolve(self, shared: &[String]) -> Result<Option<CellValue>> {
        let Some(raw) = self.raw else {
            return Ok(None);
        };
        let value = match self.kind.as_deref() {
            Some("s") => {
                let index: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| ContentError::decode(format!("bad shared string index {raw}")))?;
                let text = shared.get(index).ok_or_else(|| {
                    ContentError::decode(format!("shared string index {index} out of range"))
                })?;
                CellValue::Text(text.clone())
            }
            Some("b") => CellValue::Bool(raw.trim() == "1"),
            Some("str") | Some("inlineStr") | Some("e") => CellValue::Text(raw),
            _ => match raw.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(raw),
            },
        };
        Ok(Some(value))
    }
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Sheet> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = Sheet::default();
    let mut row: Option<Vec<Option<CellValue>>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => cell = Some(start_cell(e, row.as_ref())?),
                b"v" | b"t" if cell.is_some() => capture = true,
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                // Self-closing rows and cells carry no values.
                b"row" => {}
                b"c" => {
                    let pending = start_cell(e, row.as_ref())?;
                    if let Some(cells) = row.as_mut() {
                        place(cells, pending.column, None);
                    }
                }
                _ => {}
            },
            Event::Text(ref e) if capture => {
                if let Some(pending) = cell.as_mut() {
                    pending
                        .raw
                        .get_or_insert_with(String::new)
                        .push_str(&e.unescape()?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let (Some(pending), Some(cells)) = (cell.take(), row.as_mut()) {
                        let column = pending.column;
                        place(cells, column, pending.resolve(shared)?);
                    }
                }
                b"row" => {
                    if let Some(cells) = row.take() {
                        if cells.iter().any(Option::is_some) {
                            sheet.cells.push(cells);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheet)
}

fn start_cell(e: &BytesStart<'_>, row: Option<&Vec<Option<CellValue>>>) -> Result<PendingCell> {
    let column = attribute(e, b"r")?
        .as_deref()
        .and_then(column_index)
        .unwrap_or_else(|| row.map_or(0, Vec::len));
    Ok(PendingCell {
        column,
        kind: attribute(e, b"t")?,
        raw: None,
    })
}

fn place(cells: &mut Vec<Option<CellValue>>, column: usize, value: Option<CellValue>) {
    if cells.len() <= column {
        cells.resize(column + 1, None);
    }
    if value.is_some() {
        cells[column] = value;
    }
}
