//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::utils::http::FetchClient;

/// In-memory [`FetchClient`] with failure injection and call counting.
#[derive(Default)]
pub struct StubClient {
    bodies: HashMap<String, Vec<u8>>,
    failures: HashMap<String, usize>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn page(self, url: &str, body: impl Into<String>) -> Self {
        self.bytes(url, body.into().into_bytes())
    }

    pub fn bytes(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Fail the first `count` requests for `url`.
    pub fn fail_first(mut self, url: &str, count: usize) -> Self {
        self.failures.insert(url.to_string(), count);
        self
    }

    pub fn fail_always(self, url: &str) -> Self {
        self.fail_first(url, usize::MAX)
    }

    /// Number of requests issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Number of requests issued in total.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl FetchClient for StubClient {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if self.failures.get(url).is_some_and(|&limit| call <= limit) {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("stub refused {url}"),
            )));
        }

        self.bodies.get(url).cloned().ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("stub has no page for {url}"),
            ))
        })
    }
}

/// Listing page markup in the site's layout.
///
/// `page_count` is embedded as the page-count script when given.
pub fn listing_page(page_count: Option<usize>, links: &[(&str, &str)]) -> String {
    let script = page_count
        .map(|count| format!("<script>var countPage = {count}; var currentPage = 0;</script>"))
        .unwrap_or_default();
    let items: String = links
        .iter()
        .map(|(href, title)| {
            format!(r#"<li><span><a href="{href}">{title}</a></span><strong>2024-01-01</strong></li>"#)
        })
        .collect();
    format!(
        r#"<html><head><title>list</title>{script}</head>
        <body><ul class="normal_list2">{items}</ul></body></html>"#
    )
}

/// Post page markup in the site's layout.
pub fn detail_page(title: &str, author: &str, date: &str, body: &str, files: &[&str]) -> String {
    let files: String = files
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">attachment</a></li>"#))
        .collect();
    format!(
        "<html><head><title>欢迎访问武汉理工大学综合信息系统</title></head><body>\
         <div class=\"art_tit\"><h2>{title}</h2></div>\
         <div class=\"art_info\">发布：{author}\u{a0}\u{a0}时间：{date}\u{a0}\u{a0}我要纠错</div>\
         <div class=\"art_text\"><p>{body}</p><img src=\"/images/a.png\"></div>\
         <div class=\"file_box\"><ul>{files}</ul></div>\
         </body></html>"
    )
}
