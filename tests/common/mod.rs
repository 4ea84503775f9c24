#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum_test::TestServer;
use reqwest::Url;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use top_tiulim::cache::ContentCache;
use top_tiulim::contact::{EmailClient, EmailJsCredentials};
use top_tiulim::content::ContentService;
use top_tiulim::spreadsheet::HttpSheetSource;
use top_tiulim::{create_app, AppState};

pub type SheetFixture = (&'static str, Vec<Vec<Value>>);

fn column(mut index: usize) -> String {
    let mut letters = Vec::new();
    index += 1;
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn sheet_xml(rows: &[Vec<Value>]) -> String {
    let mut xml = String::from("<worksheet><sheetData>");
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            let reference = format!("{}{}", column(c), r + 1);
            match value {
                Value::Null => {}
                Value::Bool(b) => xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"b\"><v>{}</v></c>",
                    u8::from(*b)
                )),
                Value::Number(n) => xml.push_str(&format!("<c r=\"{reference}\"><v>{n}</v></c>")),
                Value::String(s) => xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    escape(s)
                )),
                other => xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    escape(&other.to_string())
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Builds an `.xlsx` archive holding the given sheets in order.
pub fn workbook_bytes(sheets: &[SheetFixture]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let mut workbook = String::from(
        r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from("<Relationships>");
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{n}\" r:id=\"rId{n}\"/>",
            escape(name)
        ));
        rels.push_str(&format!(
            "<Relationship Id=\"rId{n}\" Target=\"worksheets/sheet{n}.xml\"/>"
        ));
    }
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook.as_bytes()).unwrap();
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();
    for (i, (_, rows)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(sheet_xml(rows).as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn deal_sheet() -> SheetFixture {
    (
        "Deals",
        vec![
            vec![
                json!("id"), json!("country"), json!("destination"), json!("title"),
                json!("description"), json!("date"), json!("price"), json!("mediaLinks"),
                json!("itinerarySheetId"), json!("lastSpots"),
            ],
            vec![
                json!(1), json!("Italy"), json!("Rome"), json!("Rome in spring"),
                json!("Eight days of piazzas"), json!("12/04/2026"), json!(6490),
                json!(r#"[{"type":"image","url":"https://cdn.test/rome.jpg"},{"type":"video","url":"https://cdn.test/rome.mp4"}]"#),
                json!("RomeTrip"), json!(true),
            ],
            vec![
                json!(2), json!("Georgia"), json!("Tbilisi"), json!("Wine and mountains"),
                json!("A week in the Caucasus"), json!("03/05/2026"), json!(4290),
                json!(r#"[{"type":"image","url":"https://cdn.test/tbilisi.jpg"}]"#),
                Value::Null, json!(false),
            ],
            vec![
                json!(3), json!("Italy"), json!("Dolomites"), json!("Dolomites hiking"),
                json!("Hut to hut"), json!("20/07/2026"), json!(5900),
                json!("[]"), json!("MissingTrip"), json!(false),
            ],
        ],
    )
}

pub fn itinerary_sheet() -> SheetFixture {
    (
        "RomeTrip",
        vec![
            vec![json!("daySummary"), json!("sectionTitle"), json!("sectionText"), json!("sectionImage")],
            vec![json!("Day 1 - Arrival"), json!("Landing"), json!("Check in at the hotel"), Value::Null],
            vec![json!("Day 1 - Arrival"), json!("Dinner"), json!("Trastevere"), json!("https://cdn.test/dinner.jpg")],
            vec![json!("Day 2 - Vatican"), Value::Null, json!("Sistine Chapel"), Value::Null],
        ],
    )
}

pub fn gallery_sheet() -> SheetFixture {
    (
        "Gallery",
        vec![
            vec![json!("name"), json!("images")],
            vec![json!("Italy 2025"), json!(r#"["https://cdn.test/g1.jpg","https://cdn.test/g2.jpg"]"#)],
        ],
    )
}

pub fn recommendations_sheet() -> SheetFixture {
    (
        "Recommendations",
        vec![
            vec![json!("name"), json!("recommendation")],
            vec![json!("Dana"), json!("Organized down to the last detail")],
        ],
    )
}

pub fn full_workbook() -> Vec<u8> {
    workbook_bytes(&[deal_sheet(), itinerary_sheet(), gallery_sheet(), recommendations_sheet()])
}

pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn spawn(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Publishes workbook bytes over HTTP and counts downloads.
pub struct WorkbookServer {
    pub url: Url,
    pub downloads: Arc<AtomicUsize>,
}

impl WorkbookServer {
    pub async fn start(bytes: Vec<u8>) -> Self {
        let downloads = Arc::new(AtomicUsize::new(0));
        let counter = downloads.clone();
        let bytes = Bytes::from(bytes);
        let app = axum::Router::new().route(
            "/assets/files/ourDeals.xlsx",
            get(move || {
                let counter = counter.clone();
                let bytes = bytes.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    bytes
                }
            }),
        );
        let addr = spawn(app).await;
        let url = Url::parse(&format!("http://{addr}/assets/files/ourDeals.xlsx")).unwrap();
        Self { url, downloads }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> HttpSheetSource {
        HttpSheetSource::with_client(local_client(), self.url.clone())
    }
}

/// Stand-in for the EmailJS API that records every request body.
pub struct EmailServer {
    pub url: Url,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl EmailServer {
    pub async fn start(status: StatusCode) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let app = axum::Router::new().route(
            "/api/v1.0/email/send",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    (status, "OK")
                }
            }),
        );
        let addr = spawn(app).await;
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        Self { url, requests }
    }

    pub fn client(&self) -> EmailClient {
        EmailClient::new(
            self.url.clone(),
            Some(EmailJsCredentials {
                service_id: "service_test".to_string(),
                template_id: "template_test".to_string(),
                public_key: "public_test".to_string(),
            }),
            "Naama",
        )
        .with_client(local_client())
    }
}

pub struct TestSite {
    pub server: TestServer,
    pub workbook: WorkbookServer,
    pub content: ContentService,
    pub public_dir: TempDir,
}

pub async fn setup_site_with(bytes: Vec<u8>, email: Option<EmailClient>) -> TestSite {
    let workbook = WorkbookServer::start(bytes).await;
    let public_dir = TempDir::new().expect("Failed to create temp directory");
    let content = ContentService::new(Arc::new(workbook.source()), ContentCache::new());
    let email = email.unwrap_or_else(|| {
        EmailClient::new(Url::parse("http://127.0.0.1:9/").unwrap(), None, "Naama")
    });
    let state = AppState {
        content: content.clone(),
        email,
        public_dir: public_dir.path().to_path_buf(),
    };
    let server = TestServer::new(create_app(state)).expect("Failed to create test server");
    TestSite {
        server,
        workbook,
        content,
        public_dir,
    }
}

/// A site backed by a workbook with every sheet populated.
pub async fn setup_site() -> TestSite {
    setup_site_with(full_workbook(), None).await
}
