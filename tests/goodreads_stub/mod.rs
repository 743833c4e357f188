use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Canned responses keyed by resource and `page` query value.
#[derive(Debug, Clone, Default)]
pub struct GoodreadsStubConfig {
    pub api_key: String,
    pub review_pages: HashMap<u32, String>,
    pub status_pages: HashMap<u32, String>,
}

pub struct GoodreadsStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GoodreadsStub {
    pub fn spawn(config: GoodreadsStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start goodreads stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                let params: HashMap<&str, &str> = query
                    .split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .collect();
                let page = params.get("page").and_then(|p| p.parse::<u32>().ok());

                let (status, content_type, body) = if path == "/review/list.xml" {
                    if params.get("key").copied() != Some(config.api_key.as_str()) {
                        (401, "text/plain", "Invalid API key".to_owned())
                    } else {
                        match page.and_then(|p| config.review_pages.get(&p)) {
                            Some(body) => (200, "application/xml", body.clone()),
                            None => (404, "text/plain", "no such review page".to_owned()),
                        }
                    }
                } else if path.starts_with("/user_status/list/") {
                    match page.and_then(|p| config.status_pages.get(&p)) {
                        Some(body) => (200, "text/html; charset=utf-8", body.clone()),
                        None => (404, "text/plain", "no such status page".to_owned()),
                    }
                } else {
                    (404, "text/plain", "not found".to_owned())
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                        .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for GoodreadsStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn review_xml(id: u32, title: &str, rating: u8, body: &str, shelves: &[&str]) -> String {
    let shelves: String = shelves
        .iter()
        .map(|name| format!(r#"<shelf name="{name}" exclusive="false"/>"#))
        .collect();
    format!(
        r#"<review>
  <id>{id}00</id>
  <book>
    <id type="integer">{id}</id>
    <isbn>isbn-{id}</isbn>
    <isbn13>isbn13-{id}</isbn13>
    <title>{title}</title>
    <num_pages>{id}0</num_pages>
    <authors><author><id>9</id><name>Author {id}</name></author></authors>
  </book>
  <rating>{rating}</rating>
  <shelves>{shelves}</shelves>
  <date_added>Mon Oct 24 12:26:31 -0700 2016</date_added>
  <read_at></read_at>
  <body><![CDATA[{body}]]></body>
</review>"#
    )
}

pub fn review_page(reviews: &[String], end: usize, total: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<GoodreadsResponse>
  <Request><authentication>true</authentication></Request>
  <reviews start="1" end="{end}" total="{total}">
{}
  </reviews>
</GoodreadsResponse>"#,
        reviews.join("\n")
    )
}

pub fn status_block(id: u32, header: &str, body: &str) -> String {
    format!(
        r#"<div class="elementList">
  <div class="left">
    <div class="bookMeta">
      <a href="/user/show/7-jane">Jane</a> {header}
      <a rel="nofollow" href="/book/show/{id}.Some_Book">Book {id}</a>
    </div>
    <div class="readable">{body}</div>
    <small><a href="/user_status/show/{id}000">Mar 1, 2021 7:15PM</a></small>
  </div>
</div>"#
    )
}

pub fn status_page(showing: &str, blocks: &[String]) -> String {
    format!(
        r#"<!doctype html>
<html><body>
  <div class="leftContainer">
    <div class="greyText smallText">{showing}</div>
{}
  </div>
</body></html>"#,
        blocks.join("\n")
    )
}
